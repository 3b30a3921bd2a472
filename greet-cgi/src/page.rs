// -*- coding: utf-8 -*-
//
// Greet CGI
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow as ah;
use greet_query::Query;
use std::{fmt::Write as _, writeln as ln};

const DEFAULT_HTML_ALLOC: usize = 256;

/// Substituted for a parameter that is absent or not valid UTF-8.
pub const DEFAULT_TEXT: &str = "Unknown";

pub fn html_safe_escape(text: &str) -> String {
    html_escape::encode_safe(text).to_string()
}

/// Generate the greeting document.
///
/// The output is always well formed HTML.
/// Both parameter values are escaped before embedding,
/// so no input can inject markup.
pub fn generate(query: &Query) -> ah::Result<String> {
    let name = query
        .get_str("name")
        .unwrap_or_else(|| DEFAULT_TEXT.to_string());
    let age = query
        .get_str("age")
        .unwrap_or_else(|| DEFAULT_TEXT.to_string());
    let name = html_safe_escape(&name);
    let age = html_safe_escape(&age);

    let mut b = String::with_capacity(DEFAULT_HTML_ALLOC);
    ln!(b, "<html><head><title>CGI Script</title></head>")?;
    ln!(b, "<body>")?;
    ln!(b, "<h1>CGI Script Response</h1>")?;
    ln!(b, "<p>Name: {name}</p>")?;
    ln!(b, "<p>Age: {age}</p>")?;
    ln!(b, "</body></html>")?;
    Ok(b)
}


// vim: ts=4 sw=4 expandtab
