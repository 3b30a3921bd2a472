// -*- coding: utf-8 -*-
//
// Greet CGI
//
// Copyright (C) 2024 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::page;
use anyhow::{self as ah, format_err as err};
use greet_query::{parse_querystring, Query};
use std::{
    env,
    ffi::OsString,
    io::{self, Read, Stdout, Write as _},
    time::Instant,
};

const DEBUG: bool = false;

const MAX_CGIENV_LEN: usize = 1024 * 4;
const MAX_CGIENV_U32_LEN: usize = 10;
const MAX_POST_BODY_LEN: u32 = 1024 * 1024;

const MIME_HTML: &str = "text/html";
const MIME_URLENCODED: &str = "application/x-www-form-urlencoded";

fn get_cgienv(name: &str) -> ah::Result<OsString> {
    let value = env::var_os(name).unwrap_or_default();
    if value.len() <= MAX_CGIENV_LEN {
        Ok(value)
    } else {
        Err(err!("Environment variable '{name}' is too long."))
    }
}

fn get_cgienv_str(name: &str) -> ah::Result<String> {
    if let Ok(s) = get_cgienv(name)?.into_string() {
        Ok(s)
    } else {
        Err(err!("Environment variable '{name}' is not valid UTF-8."))
    }
}

fn get_cgienv_u32(name: &str) -> ah::Result<u32> {
    let value = get_cgienv_str(name)?;
    let value = value.trim();
    if value.len() <= MAX_CGIENV_U32_LEN {
        Ok(value.parse::<u32>()?)
    } else {
        Err(err!("Environment variable '{name}' is too long (u32)."))
    }
}

/// The mime type of a CONTENT_TYPE value, without parameters.
fn content_type_mime(body_type: &str) -> &str {
    body_type.split(';').next().unwrap_or("").trim()
}

fn out(f: &mut Stdout, data: &[u8]) {
    f.write_all(data).unwrap();
}

fn outstr(f: &mut Stdout, data: &str) {
    out(f, data.as_bytes());
}

fn response_200_ok(body: Option<&[u8]>, mime: &str, start_stamp: Option<Instant>) {
    let mut f = io::stdout();
    outstr(&mut f, &format!("Content-type: {mime}\n"));
    outstr(&mut f, "Status: 200 Ok\n");
    if let Some(start_stamp) = start_stamp {
        let runtime = (Instant::now() - start_stamp).as_micros();
        outstr(&mut f, &format!("X-Greet-Cgi-Runtime: {runtime} us\n"));
    }
    outstr(&mut f, "\n");
    if let Some(body) = body {
        out(&mut f, body);
    }
}

fn response_400_bad_request(err: &str) {
    let mut f = io::stdout();
    outstr(&mut f, "Content-type: text/plain\n");
    outstr(&mut f, "Status: 400 Bad Request\n");
    outstr(&mut f, "\n");
    outstr(&mut f, err);
}

fn response_500_internal_error(err: &str) {
    let mut f = io::stdout();
    outstr(&mut f, "Content-type: text/plain\n");
    outstr(&mut f, "Status: 500 Internal Server Error\n");
    outstr(&mut f, "\n");
    outstr(&mut f, err);
}

/// A request refusal, to be emitted as a CGI error response.
#[derive(Debug, PartialEq, Eq)]
enum CgiError {
    BadRequest(String),
    Internal(String),
}

pub struct Cgi {
    query: String,
    meth: String,
    body_len: u32,
    body_type: String,
    start_stamp: Option<Instant>,
}

impl Cgi {
    /// Gather the request state from the CGI environment.
    ///
    /// A `query_override` replaces QUERY_STRING and defaults the
    /// request method to GET, for command line testing.
    pub fn new(query_override: Option<String>) -> ah::Result<Self> {
        let start_stamp = if DEBUG { Some(Instant::now()) } else { None };

        let command_line = query_override.is_some();
        let query = match query_override {
            Some(query) => query,
            None => get_cgienv_str("QUERY_STRING").unwrap_or_default(),
        };
        let mut meth = get_cgienv_str("REQUEST_METHOD")?.trim().to_string();
        if meth.is_empty() && command_line {
            meth = "GET".to_string();
        }
        let body_len = get_cgienv_u32("CONTENT_LENGTH").unwrap_or_default();
        let body_type = get_cgienv_str("CONTENT_TYPE").unwrap_or_default();

        Ok(Self {
            query,
            meth,
            body_len,
            body_type,
            start_stamp,
        })
    }

    /// Read the parameter source for this request method.
    ///
    /// GET and HEAD take the query string.
    /// POST takes an urlencoded request body from `body_input`.
    fn read_params(&self, body_input: &mut impl Read) -> Result<Query, CgiError> {
        match &self.meth[..] {
            "GET" | "HEAD" => Ok(parse_querystring(&self.query)),
            "POST" => {
                if self.body_len == 0 {
                    return Err(CgiError::BadRequest(
                        "POST: CONTENT_LENGTH is zero.".to_string(),
                    ));
                }
                if self.body_len > MAX_POST_BODY_LEN {
                    return Err(CgiError::BadRequest(
                        "POST: CONTENT_LENGTH is too large.".to_string(),
                    ));
                }
                if content_type_mime(&self.body_type) != MIME_URLENCODED {
                    return Err(CgiError::BadRequest(
                        "POST: Invalid CONTENT_TYPE.".to_string(),
                    ));
                }

                let mut body = vec![0; self.body_len.try_into().unwrap()];
                if body_input.read_exact(&mut body).is_err() {
                    return Err(CgiError::Internal("CGI stdin read failed.".to_string()));
                }

                Ok(parse_querystring(&String::from_utf8_lossy(&body)))
            }
            _ => {
                let meth = &self.meth;
                Err(CgiError::BadRequest(format!(
                    "Unsupported REQUEST_METHOD: '{meth}'"
                )))
            }
        }
    }

    /// HEAD gets the headers, but no body.
    fn body_suppressed(&self) -> bool {
        self.meth == "HEAD"
    }

    pub fn run(&mut self) {
        let query = match self.read_params(&mut io::stdin()) {
            Ok(query) => query,
            Err(CgiError::BadRequest(e)) => {
                response_400_bad_request(&e);
                return;
            }
            Err(CgiError::Internal(e)) => {
                response_500_internal_error(&e);
                return;
            }
        };

        let Ok(body) = page::generate(&query) else {
            response_500_internal_error("Page generation failed.");
            return;
        };

        let body = if self.body_suppressed() {
            None
        } else {
            Some(body.as_bytes())
        };
        response_200_ok(body, MIME_HTML, self.start_stamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cgi(meth: &str, query: &str, body_len: u32, body_type: &str) -> Cgi {
        Cgi {
            query: query.to_string(),
            meth: meth.to_string(),
            body_len,
            body_type: body_type.to_string(),
            start_stamp: None,
        }
    }

    fn no_body() -> io::Cursor<Vec<u8>> {
        io::Cursor::new(vec![])
    }

    #[test]
    fn test_get_params_from_querystring() {
        let cgi = make_cgi("GET", "name=Alice&age=30", 0, "");
        let q = cgi.read_params(&mut no_body()).unwrap();
        assert_eq!(q.get_str("name").as_deref(), Some("Alice"));
        assert_eq!(q.get_str("age").as_deref(), Some("30"));
        assert!(!cgi.body_suppressed());
    }

    #[test]
    fn test_head_params_from_querystring() {
        let cgi = make_cgi("HEAD", "name=Alice", 0, "");
        let q = cgi.read_params(&mut no_body()).unwrap();
        assert_eq!(q.get_str("name").as_deref(), Some("Alice"));
        assert!(cgi.body_suppressed());
    }

    #[test]
    fn test_post_body_honored() {
        let body = b"name=Bob&age=42";
        let cgi = make_cgi("POST", "", body.len() as u32, MIME_URLENCODED);
        let q = cgi
            .read_params(&mut io::Cursor::new(body.to_vec()))
            .unwrap();
        assert_eq!(q.get_str("name").as_deref(), Some("Bob"));
        assert_eq!(q.get_str("age").as_deref(), Some("42"));
        assert!(!cgi.body_suppressed());
    }

    #[test]
    fn test_post_ignores_querystring() {
        let body = b"name=Bob";
        let cgi = make_cgi("POST", "name=Alice", body.len() as u32, MIME_URLENCODED);
        let q = cgi
            .read_params(&mut io::Cursor::new(body.to_vec()))
            .unwrap();
        assert_eq!(q.get_str("name").as_deref(), Some("Bob"));
    }

    #[test]
    fn test_post_content_type_params_accepted() {
        let body = b"name=Bob";
        let ctype = "application/x-www-form-urlencoded; charset=UTF-8";
        let cgi = make_cgi("POST", "", body.len() as u32, ctype);
        let q = cgi
            .read_params(&mut io::Cursor::new(body.to_vec()))
            .unwrap();
        assert_eq!(q.get_str("name").as_deref(), Some("Bob"));
    }

    #[test]
    fn test_post_multipart_refused() {
        let cgi = make_cgi("POST", "", 8, "multipart/form-data; boundary=x");
        let e = cgi.read_params(&mut no_body()).unwrap_err();
        assert_eq!(
            e,
            CgiError::BadRequest("POST: Invalid CONTENT_TYPE.".to_string())
        );
    }

    #[test]
    fn test_post_zero_length_refused() {
        let cgi = make_cgi("POST", "", 0, MIME_URLENCODED);
        let e = cgi.read_params(&mut no_body()).unwrap_err();
        assert_eq!(
            e,
            CgiError::BadRequest("POST: CONTENT_LENGTH is zero.".to_string())
        );
    }

    #[test]
    fn test_post_oversized_refused() {
        let cgi = make_cgi("POST", "", MAX_POST_BODY_LEN + 1, MIME_URLENCODED);
        let e = cgi.read_params(&mut no_body()).unwrap_err();
        assert_eq!(
            e,
            CgiError::BadRequest("POST: CONTENT_LENGTH is too large.".to_string())
        );
    }

    #[test]
    fn test_post_short_body_is_internal_error() {
        let cgi = make_cgi("POST", "", 100, MIME_URLENCODED);
        let e = cgi
            .read_params(&mut io::Cursor::new(b"name=Bob".to_vec()))
            .unwrap_err();
        assert!(matches!(e, CgiError::Internal(_)));
    }

    #[test]
    fn test_unsupported_method_refused() {
        for meth in ["DELETE", "PUT", ""] {
            let cgi = make_cgi(meth, "name=Alice", 0, "");
            let e = cgi.read_params(&mut no_body()).unwrap_err();
            assert!(matches!(e, CgiError::BadRequest(_)));
        }
    }

    #[test]
    fn test_content_type_mime() {
        assert_eq!(
            content_type_mime("application/x-www-form-urlencoded"),
            MIME_URLENCODED
        );
        assert_eq!(
            content_type_mime("application/x-www-form-urlencoded; charset=UTF-8"),
            MIME_URLENCODED
        );
        assert_eq!(
            content_type_mime(" application/x-www-form-urlencoded "),
            MIME_URLENCODED
        );
        assert_ne!(content_type_mime("multipart/form-data; boundary=x"), MIME_URLENCODED);
        assert_eq!(content_type_mime(""), "");
    }
}

// vim: ts=4 sw=4 expandtab
