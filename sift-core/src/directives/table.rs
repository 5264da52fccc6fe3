//! table — generate an HTML table from separator-joined lists.

use crate::directives::split_list;
use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;

pub struct Table;

impl Directive for Table {
    fn name(&self) -> &str {
        "table"
    }

    fn description(&self) -> &str {
        "Generate an HTML table from list-valued options"
    }

    fn options(&self) -> &[&[&str]] {
        &[
            &["id"],
            &["caption", "c"],
            &["columns", "n"],
            &["column_headings", "ch"],
            &["cells", "cl"],
        ]
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let separator = call.env.field_separator.clone();
        let headings_text = call.expand(call.args.arg_firstof("", &["column_headings", "ch"]))?;
        let cells_text = call.expand(call.args.arg_firstof("", &["cells", "cl"]))?;
        let caption = call.expand(call.args.arg_firstof("", &["caption", "c"]))?;
        let id = call.args.arg_firstof("", &["id"]).to_string();

        let headings = split_list(&headings_text, &separator);
        let cells = split_list(&cells_text, &separator);

        let columns_text = call.args.arg_firstof("", &["columns", "n"]).to_string();
        let columns: usize = if columns_text.is_empty() {
            if headings.is_empty() {
                return Err(DirectiveError::MalformedCall {
                    directive: "table".to_string(),
                    detail: "neither 'columns' nor 'column_headings' given".to_string(),
                });
            }
            headings.len()
        } else {
            columns_text
                .parse()
                .map_err(|_| DirectiveError::MalformedCall {
                    directive: "table".to_string(),
                    detail: format!("columns '{}' is not a number", columns_text),
                })?
        };

        if !headings.is_empty() && headings.len() != columns {
            return Err(DirectiveError::ListLengthMismatch {
                directive: "table".to_string(),
                option: "column_headings".to_string(),
                expected: columns,
                got: headings.len(),
            });
        }
        if columns == 0 || cells.len() % columns != 0 {
            return Err(DirectiveError::ListLengthMismatch {
                directive: "table".to_string(),
                option: "cells".to_string(),
                expected: columns,
                got: cells.len(),
            });
        }

        let mut html = String::new();
        if id.is_empty() {
            html.push_str("<table>");
        } else {
            html.push_str(&format!("<table id=\"{}\">", id));
        }
        if !caption.is_empty() {
            html.push_str(&format!("<caption>{}</caption>", caption));
        }
        if !headings.is_empty() {
            html.push_str("<tr>");
            for heading in &headings {
                html.push_str(&format!("<th>{}</th>", heading));
            }
            html.push_str("</tr>");
        }
        for row in cells.chunks(columns) {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", cell));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        Ok(html)
    }
}
