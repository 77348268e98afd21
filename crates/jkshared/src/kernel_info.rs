/*
 * kernel_info.rs
 *
 * Copyright (C) 2025 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

/// Represents a help link in a Jupyter message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HelpLink {
    /// The text to display for the link
    pub text: String,

    /// The location (URL) of the help link
    pub url: String,
}

/// Represents information about the language that the kernel implements
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LanguageInfo {
    /// The name of the programming language the kernel implements
    pub name: String,

    /// The version of the language
    #[serde(default)]
    pub version: String,

    /// The MIME type for script files in the language
    #[serde(default)]
    pub mimetype: String,

    /// The file extension for script files in the language
    #[serde(default)]
    pub file_extension: String,

    /// Pygments lexer (for highlighting), if different than `name`
    pub pygments_lexer: Option<String>,

    /// Codemirror mode (for editing), if different than `name`. Either a
    /// mode name or an object such as `{"name": "ipython", "version": 3}`.
    pub codemirror_mode: Option<serde_json::Value>,

    /// Nbconvert exporter, if not the default 'script' exporter
    pub nbconvert_exporter: Option<String>,
}

/// Represents a reply to a kernel_info_request.
///
/// Protocol 5 kernels describe their language in `language_info`; older
/// kernels send the flat `language` and `language_version` fields instead.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KernelInfoReply {
    /// Version of messaging protocol
    #[serde(default)]
    pub protocol_version: String,

    /// The kernel implementation name, e.g. "ipython"
    #[serde(default)]
    pub implementation: String,

    /// The kernel implementation version
    #[serde(default)]
    pub implementation_version: String,

    /// Information about the language the kernel supports
    pub language_info: Option<LanguageInfo>,

    /// Language name (protocol 4)
    pub language: Option<String>,

    /// Language version (protocol 4); a list of version components
    pub language_version: Option<serde_json::Value>,

    /// A startup banner
    #[serde(default)]
    pub banner: String,

    /// Whether debugging is supported
    #[serde(default)]
    pub debugger: bool,

    /// A list of help links
    #[serde(default)]
    pub help_links: Vec<HelpLink>,
}

impl KernelInfoReply {
    /// The language name, wherever the kernel reported it.
    pub fn language_name(&self) -> Option<&str> {
        match &self.language_info {
            Some(info) => Some(info.name.as_str()),
            None => self.language.as_deref(),
        }
    }
}
