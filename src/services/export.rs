use crate::models::{relevant_sources, Conversation, Message};

use super::markdown::{escape_html, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Html => "HTML",
            ExportFormat::Markdown => "Markdown",
        }
    }

    pub fn export(&self, conversation: &Conversation, collection_title: &str) -> String {
        match self {
            ExportFormat::Html => export_to_html(conversation, collection_title),
            ExportFormat::Markdown => export_to_markdown(conversation),
        }
    }
}

pub fn export_to_markdown(conversation: &Conversation) -> String {
    let mut output = format!("# {}\n\n", conversation.title);
    output.push_str(&format!(
        "> Date: {}\n\n---\n\n",
        conversation.created_at.format("%Y-%m-%d %H:%M")
    ));

    for msg in conversation.messages.iter() {
        output.push_str(&format!("### {}\n\n{}\n\n", msg.role.display_name(), msg.content));

        let sources: Vec<_> = relevant_sources(&msg.sources).collect();
        if !sources.is_empty() {
            output.push_str("**Sources**\n\n");
            for source in sources {
                output.push_str(&format!(
                    "- [{}]({}) ({})\n",
                    source.display_title(),
                    source.url,
                    source.relevance_label()
                ));
            }
            output.push('\n');
        }
    }

    output
}

/// Standalone HTML page of a conversation, with every message rendered and sanitized.
pub fn export_to_html(conversation: &Conversation, collection_title: &str) -> String {
    let title = escape_html(&conversation.title);
    let mut body = String::new();

    for msg in conversation.messages.iter() {
        message_to_html(msg, &mut body);
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>{STYLE}</style>\n</head>\n<body>\n<header><h1>{title}</h1><p>{collection} | {date}</p></header>\n\
         {body}</body>\n</html>\n",
        title = title,
        collection = escape_html(collection_title),
        date = conversation.created_at.format("%Y-%m-%d %H:%M"),
        body = body,
    )
}

fn message_to_html(msg: &Message, out: &mut String) {
    out.push_str(&format!(
        "<section class=\"message {}\">\n<h2>{}</h2>\n{}\n",
        msg.role.as_str(),
        msg.role.display_name(),
        render(&msg.content)
    ));

    let sources: Vec<_> = relevant_sources(&msg.sources).collect();
    if !sources.is_empty() {
        let items: String = sources
            .iter()
            .map(|source| {
                format!(
                    "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a> ({})</li>",
                    escape_html(&source.url),
                    escape_html(source.display_title()),
                    source.relevance_label()
                )
            })
            .collect();
        out.push_str(&format!("<ul class=\"sources\">{}</ul>\n", items));
    }

    out.push_str("</section>\n");
}

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;line-height:1.5}\
section{border-top:1px solid #ddd;padding:0.5rem 0}\
section.user h2{color:#1c71d8}\
pre{background:#f6f5f4;padding:0.75rem;overflow-x:auto}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:0.25rem 0.5rem}\
.sources{font-size:0.9em}";
