/*
BSD 2-Clause License

Copyright (c) 2022, Diagnosis and Control of Clouds Laboratory
All rights reserved.

Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

1. Redistributions of source code must retain the above copyright notice, this
   list of conditions and the following disclaimer.

2. Redistributions in binary form must reproduce the above copyright notice,
   this list of conditions and the following disclaimer in the documentation
   and/or other materials provided with the distribution.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

*/

//! C4.5 — Entity type classifier: a fixed first-match cascade applied once
//! at entity creation (spec.md §4.5).

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref IPV4: Regex =
        Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}(:\d+)?$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z]\w*-\w+$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^\d+$").unwrap();
    static ref CODE: Regex = Regex::new(r"^[A-Z0-9_]{3,}$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Ip,
    Path,
    BlockId,
    Identifier,
    Number,
    Code,
    Token,
    Unknown,
}

/// Classifies `value` into its entity type by the fixed cascade: ip → path
/// → block_id → identifier → number → code → token; empty → unknown.
pub fn classify(value: &str) -> EntityType {
    if value.is_empty() {
        return EntityType::Unknown;
    }
    if IPV4.is_match(value) {
        EntityType::Ip
    } else if value.starts_with('/') || value.starts_with("./") {
        EntityType::Path
    } else if value.starts_with("blk_") {
        EntityType::BlockId
    } else if IDENTIFIER.is_match(value) {
        EntityType::Identifier
    } else if NUMBER.is_match(value) {
        EntityType::Number
    } else if CODE.is_match(value) {
        EntityType::Code
    } else {
        EntityType::Token
    }
}

/// Returns the bare IPv4 address of `value` if it matches `IPv4(:port)?`,
/// whether or not a port suffix is present (spec.md §4.4 step 2: "also add
/// the bare IPv4" — unconditional on the port, not gated behind it).
pub fn bare_ipv4(value: &str) -> Option<&str> {
    if !IPV4.is_match(value) {
        return None;
    }
    match value.split_once(':') {
        Some((addr, _port)) => Some(addr),
        None => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_in_cascade_order() {
        assert_eq!(classify("10.0.0.5:443"), EntityType::Ip);
        assert_eq!(classify("/var/log/app.log"), EntityType::Path);
        assert_eq!(classify("./relative"), EntityType::Path);
        assert_eq!(classify("blk_-1608999687919862906"), EntityType::BlockId);
        assert_eq!(classify("node-7"), EntityType::Identifier);
        assert_eq!(classify("42"), EntityType::Number);
        assert_eq!(classify("ABC_123"), EntityType::Code);
        assert_eq!(classify("hello"), EntityType::Token);
        assert_eq!(classify(""), EntityType::Unknown);
    }

    #[test]
    fn bare_ipv4_splits_port() {
        assert_eq!(bare_ipv4("10.0.0.5:443"), Some("10.0.0.5"));
        assert_eq!(bare_ipv4("10.0.0.5"), Some("10.0.0.5"));
        assert_eq!(bare_ipv4("node-7"), None);
    }
}
