//! Core types shared by the naming and path history subsystems.

/// NodeId: storage-assigned identifier of a node in the content tree
pub type NodeId = u64;

/// LanguageId: identifier of a language known to the language provider
pub type LanguageId = u32;

/// Language id used for default (or language-less) names and history records
pub const DEFAULT_LANGUAGE: LanguageId = 0;
