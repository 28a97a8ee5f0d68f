//! # XBEL Tree Parser
//!
//! Turns an XBEL export into an in-memory bookmark tree.
//!
//! Only `folder`, `bookmark` and their `title` children carry meaning here.
//! Everything else (`separator`, `desc`, `info`, metadata blocks) is skipped
//! along with its content. Child order is preserved exactly as it appears in
//! the document.

use crate::error::{Result, SyncError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Title used for folders that carry no `<title>`
pub const DEFAULT_FOLDER_TITLE: &str = "Bookmarks";

/// A node of the bookmark tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkNode {
    Folder(Folder),
    Bookmark(Bookmark),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub title: String,
    /// Folders and bookmarks, interleaved in document order
    pub children: Vec<BookmarkNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    pub href: String,
}

impl Folder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            children: Vec::new(),
        }
    }

    /// Direct bookmark children, in order
    pub fn bookmarks(&self) -> impl Iterator<Item = &Bookmark> {
        self.children.iter().filter_map(|child| match child {
            BookmarkNode::Bookmark(b) => Some(b),
            BookmarkNode::Folder(_) => None,
        })
    }

    /// Direct folder children, in order
    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.children.iter().filter_map(|child| match child {
            BookmarkNode::Folder(f) => Some(f),
            BookmarkNode::Bookmark(_) => None,
        })
    }

    /// Bookmarks at any depth below this folder
    pub fn bookmark_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                BookmarkNode::Bookmark(_) => 1,
                BookmarkNode::Folder(f) => f.bookmark_count(),
            })
            .sum()
    }
}

enum Frame {
    Folder {
        title: Option<String>,
        children: Vec<BookmarkNode>,
    },
    Bookmark {
        href: Option<String>,
        title: Option<String>,
    },
    Title(String),
    Skip,
}

/// Parse an XBEL document. The `<xbel>` root becomes the returned folder.
pub fn parse_xbel(xml: &str) -> Result<Folder> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Folder> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let frame = open_frame(&start, stack.last(), root.is_some())?;
                stack.push(frame);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| SyncError::Parse("unbalanced closing tag".to_string()))?;
                close_frame(frame, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(Frame::Title(buffer)) = stack.last_mut() {
                    buffer.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(Frame::Title(buffer)) = stack.last_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SyncError::Parse("unexpected end of document".to_string()));
    }

    root.ok_or_else(|| SyncError::Parse("missing <xbel> root element".to_string()))
}

fn open_frame(start: &BytesStart<'_>, parent: Option<&Frame>, root_seen: bool) -> Result<Frame> {
    let name = start.name();
    let name = name.as_ref();

    let frame = match parent {
        None if name == b"xbel" && !root_seen => Frame::Folder {
            title: None,
            children: Vec::new(),
        },
        None => {
            return Err(SyncError::Parse(format!(
                "unexpected root element <{}>",
                String::from_utf8_lossy(name)
            )))
        }
        Some(Frame::Folder { .. }) => match name {
            b"folder" => Frame::Folder {
                title: None,
                children: Vec::new(),
            },
            b"bookmark" => {
                let href = match start
                    .try_get_attribute("href")
                    .map_err(quick_xml::Error::from)?
                {
                    Some(attr) => Some(attr.unescape_value()?.into_owned()),
                    None => None,
                };
                Frame::Bookmark { href, title: None }
            }
            b"title" => Frame::Title(String::new()),
            _ => Frame::Skip,
        },
        Some(Frame::Bookmark { .. }) if name == b"title" => Frame::Title(String::new()),
        Some(_) => Frame::Skip,
    };

    Ok(frame)
}

fn close_frame(frame: Frame, stack: &mut [Frame], root: &mut Option<Folder>) -> Result<()> {
    match frame {
        Frame::Title(text) => match stack.last_mut() {
            Some(Frame::Folder { title, .. }) | Some(Frame::Bookmark { title, .. }) => {
                // First title wins
                if title.is_none() {
                    *title = Some(text.trim().to_string());
                }
            }
            _ => {}
        },
        Frame::Folder { title, children } => {
            let folder = Folder {
                title: title.unwrap_or_else(|| DEFAULT_FOLDER_TITLE.to_string()),
                children,
            };
            match stack.last_mut() {
                Some(Frame::Folder { children, .. }) => children.push(BookmarkNode::Folder(folder)),
                _ => *root = Some(folder),
            }
        }
        Frame::Bookmark { href, title } => {
            let href = href.ok_or_else(|| {
                SyncError::Parse("bookmark without href attribute".to_string())
            })?;
            let title = title.ok_or_else(|| {
                SyncError::Parse(format!("bookmark {} has no title", href))
            })?;
            if let Some(Frame::Folder { children, .. }) = stack.last_mut() {
                children.push(BookmarkNode::Bookmark(Bookmark { title, href }));
            }
        }
        Frame::Skip => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_tree_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE xbel PUBLIC "+//IDN python.org//DTD XML Bookmark Exchange Language 1.0//EN//XML" "http://pyxml.sourceforge.net/topics/dtds/xbel.dtd">
<xbel version="1.0">
  <folder>
    <title>Work</title>
    <bookmark href="http://a.test"><title>A</title></bookmark>
    <folder><title>Deep</title></folder>
    <bookmark href="http://b.test"><title>B</title></bookmark>
  </folder>
  <bookmark href="http://c.test"><title>C</title></bookmark>
</xbel>"#;

        let root = parse_xbel(xml).unwrap();
        assert_eq!(root.title, "Bookmarks");
        assert_eq!(root.children.len(), 2);

        let work = root.folders().next().unwrap();
        assert_eq!(work.title, "Work");
        let titles: Vec<_> = work.bookmarks().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert!(matches!(work.children[1], BookmarkNode::Folder(_)));
        assert_eq!(root.bookmark_count(), 3);
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = r#"<xbel><bookmark href="http://x.test/?a=1&amp;b=2"><title>Tom &amp; Jerry</title></bookmark></xbel>"#;
        let root = parse_xbel(xml).unwrap();
        let bookmark = root.bookmarks().next().unwrap();
        assert_eq!(bookmark.href, "http://x.test/?a=1&b=2");
        assert_eq!(bookmark.title, "Tom & Jerry");
    }

    #[test]
    fn test_untitled_folder_gets_default_title() {
        let xml = r#"<xbel><folder><bookmark href="http://x.test"><title>X</title></bookmark></folder></xbel>"#;
        let root = parse_xbel(xml).unwrap();
        assert_eq!(root.folders().next().unwrap().title, DEFAULT_FOLDER_TITLE);
    }

    #[test]
    fn test_ignores_separators_and_metadata() {
        let xml = r#"<xbel>
  <info><metadata owner="x"><title>not a title</title></metadata></info>
  <title>Root</title>
  <separator/>
  <bookmark href="http://x.test"><title>X</title><desc>ignored</desc></bookmark>
</xbel>"#;
        let root = parse_xbel(xml).unwrap();
        assert_eq!(root.title, "Root");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_bookmark_without_title_is_malformed() {
        let xml = r#"<xbel><bookmark href="http://x.test"/></xbel>"#;
        assert!(matches!(parse_xbel(xml), Err(SyncError::Parse(_))));
    }

    #[test]
    fn test_bookmark_without_href_is_malformed() {
        let xml = r#"<xbel><bookmark><title>X</title></bookmark></xbel>"#;
        assert!(matches!(parse_xbel(xml), Err(SyncError::Parse(_))));
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        assert!(matches!(
            parse_xbel("<xbel><folder></xbel>"),
            Err(SyncError::Parse(_))
        ));
        assert!(matches!(parse_xbel("<xbel><folder>"), Err(SyncError::Parse(_))));
        assert!(matches!(parse_xbel(""), Err(SyncError::Parse(_))));
        assert!(matches!(
            parse_xbel("<opml><body/></opml>"),
            Err(SyncError::Parse(_))
        ));
    }
}
