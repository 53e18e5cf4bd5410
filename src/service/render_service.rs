//! Markdown rendering with syntax highlighting and an optional table of contents.

use crate::util::html::html_escape;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::Serialize;
use std::collections::HashSet;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tracing::warn;

pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// A rendered post body and the outline of its headings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedPost {
    pub html: String,
    pub toc: String,
}

#[derive(Debug, Clone, PartialEq)]
struct TocEntry {
    level: u8,
    id: String,
    text: String,
}

/// Renders post bodies. Loading the syntax and theme sets is slow, so one
/// renderer is built at startup and shared.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Uses the named syntect theme, falling back to the default one when it
    /// does not exist.
    pub fn with_theme(theme_name: &str) -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = match theme_set.themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                warn!("unknown highlight theme {:?}, using {}", theme_name, DEFAULT_THEME);
                theme_set
                    .themes
                    .remove(DEFAULT_THEME)
                    .unwrap_or_default()
            }
        };

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    pub fn theme_names() -> Vec<String> {
        ThemeSet::load_defaults().themes.into_keys().collect()
    }

    /// Renders markdown to HTML, headings keep no anchors.
    pub fn render(&self, markdown: &str) -> String {
        self.render_events(markdown, false).0
    }

    /// Renders markdown to HTML and builds the table of contents. Every
    /// heading gets an anchor id the TOC links to.
    pub fn render_with_toc(&self, markdown: &str) -> RenderedPost {
        let (html, entries) = self.render_events(markdown, true);
        RenderedPost {
            html,
            toc: build_toc(&entries),
        }
    }

    fn render_events(&self, markdown: &str, with_toc: bool) -> (String, Vec<TocEntry>) {
        let parser = Parser::new_ext(markdown, options());

        let mut events: Vec<Event> = Vec::new();
        let mut entries: Vec<TocEntry> = Vec::new();
        let mut used_ids: HashSet<String> = HashSet::new();

        // code block being collected: (language, source)
        let mut code_block: Option<(Option<String>, String)> = None;
        // heading being collected: (index of its start event, plain text)
        let mut heading: Option<(usize, String)> = None;

        for event in parser {
            if let Some((lang, source)) = code_block.as_mut() {
                match event {
                    Event::Text(text) => source.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let highlighted = self.highlight_code(source, lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                        code_block = None;
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| lang.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::Start(Tag::Heading { .. }) if with_toc => {
                    heading = Some((events.len(), String::new()));
                    events.push(event);
                }
                Event::Text(ref text) | Event::Code(ref text) if heading.is_some() => {
                    if let Some((_, heading_text)) = heading.as_mut() {
                        heading_text.push_str(text);
                    }
                    events.push(event);
                }
                Event::End(TagEnd::Heading(level)) if with_toc => {
                    if let Some((start, text)) = heading.take() {
                        let id = assign_heading_id(&mut events[start], &text, &mut used_ids);
                        entries.push(TocEntry {
                            level: heading_level(level),
                            id,
                            text: text.trim().to_string(),
                        });
                    }
                    events.push(event);
                }
                _ => events.push(event),
            }
        }

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());

        (html_output, entries)
    }

    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let code_html = match highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme)
        {
            Ok(highlighted) => highlighted,
            Err(e) => {
                warn!("cannot highlight {} code block: {}", lang, e);
                format!("<pre><code>{}</code></pre>\n", html_escape(code))
            }
        };

        format!(
            "<div class=\"highlight language-{}\">{}</div>\n",
            html_escape(lang),
            code_html
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// tables, footnotes, definition lists and `{#id}` heading attributes
fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_DEFINITION_LIST
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

// An explicit `{#id}` wins, otherwise the slug of the heading text.
// Repeated ids get `_1`, `_2`, ... appended.
fn assign_heading_id(start: &mut Event, text: &str, used_ids: &mut HashSet<String>) -> String {
    let Event::Start(Tag::Heading { id, .. }) = start else {
        return String::new();
    };

    let base = match id.as_deref() {
        Some(explicit) if !explicit.is_empty() => explicit.to_string(),
        _ => {
            let slug = slug::slugify(text);
            if slug.is_empty() {
                "section".to_string()
            } else {
                slug
            }
        }
    };

    let mut unique = base.clone();
    let mut n = 1;
    while used_ids.contains(&unique) {
        unique = format!("{}_{}", base, n);
        n += 1;
    }
    used_ids.insert(unique.clone());

    *id = Some(CowStr::from(unique.clone()));
    unique
}

// Nests the headings into lists by level. A heading shallower than the
// current list but deeper than its parent joins the current list.
fn build_toc(entries: &[TocEntry]) -> String {
    let mut toc = String::from("<div class=\"toc\">\n");

    if entries.is_empty() {
        toc.push_str("<ul></ul>\n</div>\n");
        return toc;
    }

    let mut levels: Vec<u8> = Vec::new();

    for entry in entries {
        match levels.last().copied() {
            None => {
                toc.push_str("<ul>\n");
                levels.push(entry.level);
            }
            Some(current) if entry.level > current => {
                toc.push_str("\n<ul>\n");
                levels.push(entry.level);
            }
            Some(_) => {
                toc.push_str("</li>\n");
                while levels.len() > 1 {
                    let current = levels[levels.len() - 1];
                    let parent = levels[levels.len() - 2];
                    if entry.level < current && entry.level <= parent {
                        toc.push_str("</ul>\n</li>\n");
                        levels.pop();
                    } else {
                        break;
                    }
                }
                if let Some(current) = levels.last_mut() {
                    if entry.level < *current {
                        *current = entry.level;
                    }
                }
            }
        }

        toc.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            html_escape(&entry.id),
            html_escape(&entry.text)
        ));
    }

    toc.push_str("</li>\n");
    for _ in 1..levels.len() {
        toc.push_str("</ul>\n</li>\n");
    }
    toc.push_str("</ul>\n</div>\n");

    toc
}
