//! image — generate an HTML image reference.

use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;
use crate::paths;

pub struct Image;

impl Directive for Image {
    fn name(&self) -> &str {
        "image"
    }

    fn description(&self) -> &str {
        "Generate an HTML image reference for a searched file"
    }

    fn options(&self) -> &[&[&str]] {
        &[
            &["file", "f"],
            &["width", "w"],
            &["height", "h"],
            &["title", "t"],
        ]
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let file = call.expand(call.args.arg_firstof("", &["file", "f"]))?;
        if file.is_empty() {
            return Err(DirectiveError::MalformedCall {
                directive: "image".to_string(),
                detail: "option 'file' is required".to_string(),
            });
        }
        let Some(found) = paths::search(&file, &call.env.include_paths) else {
            call.env.record_missing()?;
            return Ok(String::new());
        };

        let mut html = format!("<img src=\"{}\"", found.to_string_lossy());
        for (option, aliases) in [
            ("width", &["width", "w"][..]),
            ("height", &["height", "h"][..]),
            ("title", &["title", "t"][..]),
        ] {
            let value = call.expand(call.args.arg_firstof("", aliases))?;
            if !value.is_empty() {
                html.push_str(&format!(" {}=\"{}\"", option, value));
            }
        }
        html.push('>');
        Ok(html)
    }
}
