//! Command-line interface module.

mod args;
pub mod inspect;
pub mod swap;

pub use args::{Cli, Commands};

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::dom::Document;

/// Read and parse an HTML page from disk.
fn read_page(path: &Path) -> Result<Document> {
    let html = read_markup(path)?;
    Document::parse(&html).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_markup(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
