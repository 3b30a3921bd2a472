// -*- coding: utf-8 -*-
//
// Greet CGI
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![forbid(unsafe_code)]

use std::collections::HashMap;

/// Decode one percent-encoded query string component into raw bytes.
///
/// Decoding is best-effort: a `%` that is not followed by two hex digits
/// is passed through literally and `+` decodes to a space.
/// This never fails, for any input.
fn decode_component(component: &str) -> Vec<u8> {
    let component = component.as_bytes();
    let mut ret = Vec::with_capacity(component.len());
    let mut i = 0;
    while i < component.len() {
        match component[i] {
            b'%' => {
                let hi = component.get(i + 1).and_then(|c| (*c as char).to_digit(16));
                let lo = component.get(i + 2).and_then(|c| (*c as char).to_digit(16));
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    ret.push(((hi << 4) | lo) as u8);
                    i += 3;
                } else {
                    ret.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                ret.push(b' ');
                i += 1;
            }
            c => {
                ret.push(c);
                i += 1;
            }
        }
    }
    ret
}

/// Decoded query parameters.
///
/// The values are kept as raw bytes.
/// Use [`Query::get_str`] for UTF-8 access.
#[derive(Clone, Debug, Default)]
pub struct Query {
    items: HashMap<String, Vec<u8>>,
}

impl Query {
    fn new(items: HashMap<String, Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.items.get(name).cloned()
    }

    /// Get a parameter value as string.
    ///
    /// Returns None, if the parameter is not present
    /// or if its value is not valid UTF-8.
    pub fn get_str(&self, name: &str) -> Option<String> {
        if let Some(v) = self.get(name) {
            String::from_utf8(v).ok()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parse an `application/x-www-form-urlencoded` query string.
///
/// Pairs are separated by `&` and split at the first `=`.
/// Pairs with a blank value (or no `=` at all) are dropped.
/// If a name occurs more than once, the last occurrence wins.
/// Malformed input never fails; it decodes to whatever is salvageable.
pub fn parse_querystring(query: &str) -> Query {
    let mut items = HashMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut kv = pair.splitn(2, '=');
        let name = kv.next().unwrap_or("");
        let value = decode_component(kv.next().unwrap_or(""));
        let name = String::from_utf8_lossy(&decode_component(name)).into_owned();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        items.insert(name, value);
    }
    Query::new(items)
}


// vim: ts=4 sw=4 expandtab
