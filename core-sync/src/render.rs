//! # Markdown Renderer
//!
//! Walks a bookmark tree depth-first and produces the note text together with
//! the enrichment work-list.
//!
//! Each folder that has children becomes a heading one level deeper than its
//! parent (the root is `#`). A folder's bookmarks are written before any of its
//! subfolders. Every bookmark becomes a single `[title](url)` line.

use crate::ledger::FetchLedger;
use crate::xbel::Folder;
use core_runtime::config::join_location;
use std::collections::HashMap;

/// Number of title characters kept in an enrichment file name
pub const FILE_NAME_LENGTH: usize = 40;

const FORBIDDEN_CHARS: &[char] = &['/', ':', '*', '?', '"', '<', '>', '|'];

/// Derive an enrichment file stem from a bookmark title.
///
/// Keeps the first [`FILE_NAME_LENGTH`] characters, removes the characters
/// `/ : * ? " < > |` and trims surrounding whitespace. Applying it twice gives
/// the same result as applying it once.
///
/// Trimming runs after the characters are removed, so whitespace left next to
/// a removed character is dropped too: `"Name |"` maps to `Name`, where a
/// trim-then-strip order would keep the trailing space and write `Name .md`.
pub fn sanitize_filename(title: &str) -> String {
    let truncated: String = title
        .chars()
        .take(FILE_NAME_LENGTH)
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect();
    truncated.trim().to_string()
}

/// One enrichment fetch: `GET source_url`, body written to `output_path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub source_url: String,
    pub output_path: String,
}

/// Ordered source-URL to output-path mapping.
///
/// Source URLs are unique. Registering a URL again keeps its original position
/// and replaces the output path. Distinct URLs may share an output path; the
/// fetch that runs last overwrites the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    items: Vec<PendingFetch>,
    index: HashMap<String, usize>,
}

impl FetchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source_url: String, output_path: String) {
        match self.index.get(&source_url) {
            Some(&position) => self.items[position].output_path = output_path,
            None => {
                self.index.insert(source_url.clone(), self.items.len());
                self.items.push(PendingFetch {
                    source_url,
                    output_path,
                });
            }
        }
    }

    /// Output path registered for a source URL
    pub fn get(&self, source_url: &str) -> Option<&str> {
        self.index
            .get(source_url)
            .map(|&position| self.items[position].output_path.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingFetch> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<PendingFetch> {
        self.items
    }
}

/// Renderer inputs taken from settings
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    /// Enrichment prefix; empty disables the work-list
    pub html2md_api: &'a str,
    pub md_folder: &'a str,
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub markdown: String,
    pub pending: FetchPlan,
    /// Bookmark lines written
    pub bookmarks: usize,
}

struct RenderContext<'a> {
    options: RenderOptions<'a>,
    known: &'a FetchLedger,
    markdown: String,
    pending: FetchPlan,
    bookmarks: usize,
}

/// Render the tree rooted at `root`.
///
/// Bookmarks whose enrichment file path is already in `known` are not added
/// to the work-list.
pub fn render(root: &Folder, known: &FetchLedger, options: RenderOptions<'_>) -> RenderOutput {
    let mut ctx = RenderContext {
        options,
        known,
        markdown: String::new(),
        pending: FetchPlan::new(),
        bookmarks: 0,
    };

    render_folder(root, 0, &mut ctx);

    RenderOutput {
        markdown: ctx.markdown,
        pending: ctx.pending,
        bookmarks: ctx.bookmarks,
    }
}

fn render_folder(folder: &Folder, depth: usize, ctx: &mut RenderContext<'_>) {
    if !folder.children.is_empty() {
        if depth > 0 {
            ctx.markdown.push('\n');
        }
        ctx.markdown.push_str(&"#".repeat(depth + 1));
        ctx.markdown.push(' ');
        ctx.markdown.push_str(&folder.title);
        ctx.markdown.push('\n');
    }

    for bookmark in folder.bookmarks() {
        ctx.markdown
            .push_str(&format!("[{}]({})\n", bookmark.title, bookmark.href));
        ctx.bookmarks += 1;

        if ctx.options.html2md_api.is_empty() {
            continue;
        }

        let file_name = format!("{}.md", sanitize_filename(&bookmark.title));
        let output_path = join_location(ctx.options.md_folder, &file_name);
        if !ctx.known.contains(&output_path) {
            ctx.pending.register(
                format!("{}{}", ctx.options.html2md_api, bookmark.href),
                output_path,
            );
        }
    }

    for subfolder in folder.folders() {
        render_folder(subfolder, depth + 1, ctx);
    }
}
