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

mod cgi;
mod page;

use crate::cgi::Cgi;
use anyhow as ah;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
struct Opts {
    /// Override QUERY_STRING, for testing from the command line.
    #[arg(long)]
    query: Option<String>,
}

fn main() -> ah::Result<()> {
    let opts = Opts::parse();
    let mut cgi = Cgi::new(opts.query)?;
    cgi.run();
    Ok(())
}

// vim: ts=4 sw=4 expandtab
