use gtk::prelude::*;
use relm4::prelude::*;

use docs_chat::models::{relevant_sources, Message, Role};
use docs_chat::services::markdown::{parse_markdown, InlineSpan, MessageBlock};

pub struct MessageWidget {
    pub message: Message,
}

#[derive(Debug)]
pub enum MessageWidgetMsg {
    RequestCopy,
}

#[derive(Debug)]
pub enum MessageWidgetOutput {
    FollowUp(String),
    CopyFullContent(String),
}

#[relm4::factory(pub)]
impl FactoryComponent for MessageWidget {
    type Init = Message;
    type Input = MessageWidgetMsg;
    type Output = MessageWidgetOutput;
    type CommandOutput = ();
    type ParentWidget = gtk::Box;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_spacing: 0,
        }
    }

    fn init_model(
        message: Self::Init,
        _index: &DynamicIndex,
        _sender: FactorySender<Self>,
    ) -> Self {
        Self { message }
    }

    fn init_widgets(
        &mut self,
        _index: &DynamicIndex,
        root: Self::Root,
        _returned_widget: &<Self::ParentWidget as relm4::factory::FactoryView>::ReturnedWidget,
        sender: FactorySender<Self>,
    ) -> Self::Widgets {
        let is_user = self.message.role == Role::User;

        let bubble = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(4)
            .hexpand(true)
            .build();
        bubble.add_css_class("card");
        bubble.add_css_class(if is_user {
            "message-bubble-user"
        } else {
            "message-bubble-assistant"
        });

        let header = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(8)
            .margin_start(8)
            .margin_end(4)
            .margin_top(4)
            .build();

        let role_label = gtk::Label::builder()
            .label(self.message.role.display_name())
            .halign(gtk::Align::Start)
            .hexpand(true)
            .build();
        role_label.add_css_class("caption");
        role_label.add_css_class("dim-label");
        header.append(&role_label);

        let copy_btn = gtk::Button::builder()
            .icon_name("edit-copy-symbolic")
            .tooltip_text("Copy message")
            .build();
        copy_btn.add_css_class("flat");
        copy_btn.add_css_class("circular");
        let sender_copy = sender.input_sender().clone();
        copy_btn.connect_clicked(move |_| {
            sender_copy.emit(MessageWidgetMsg::RequestCopy);
        });
        header.append(&copy_btn);
        bubble.append(&header);

        let content_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(4)
            .margin_start(8)
            .margin_end(8)
            .margin_bottom(8)
            .build();

        if is_user {
            let label = gtk::Label::builder()
                .label(&self.message.content)
                .halign(gtk::Align::Start)
                .wrap(true)
                .wrap_mode(gtk::pango::WrapMode::WordChar)
                .selectable(true)
                .build();
            content_box.append(&label);
        } else {
            render_markdown_blocks(&content_box, &self.message.content);
        }
        bubble.append(&content_box);

        if let Some(sources) = build_sources(&self.message) {
            bubble.append(&sources);
        }

        if !self.message.follow_ups.is_empty() {
            let follow_ups = gtk::Box::builder()
                .orientation(gtk::Orientation::Vertical)
                .spacing(4)
                .margin_start(8)
                .margin_end(8)
                .margin_bottom(8)
                .build();
            follow_ups.add_css_class("follow-ups");

            for question in &self.message.follow_ups {
                let button = gtk::Button::builder()
                    .label(question)
                    .halign(gtk::Align::Start)
                    .build();
                button.add_css_class("pill");
                button.add_css_class("follow-up");
                if let Some(label) = button.child().and_downcast::<gtk::Label>() {
                    label.set_wrap(true);
                    label.set_xalign(0.0);
                }

                let question = question.clone();
                let sender_follow = sender.output_sender().clone();
                button.connect_clicked(move |_| {
                    sender_follow.emit(MessageWidgetOutput::FollowUp(question.clone()));
                });
                follow_ups.append(&button);
            }
            bubble.append(&follow_ups);
        }

        let message_row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .margin_top(4)
            .margin_bottom(4)
            .margin_start(if is_user { 64 } else { 12 })
            .margin_end(if is_user { 12 } else { 64 })
            .halign(if is_user {
                gtk::Align::End
            } else {
                gtk::Align::Fill
            })
            .build();
        message_row.append(&bubble);
        root.append(&message_row);

        let widgets = view_output!();
        widgets
    }

    fn update(&mut self, msg: Self::Input, sender: FactorySender<Self>) {
        match msg {
            MessageWidgetMsg::RequestCopy => {
                let _ = sender.output(MessageWidgetOutput::CopyFullContent(
                    self.message.content.clone(),
                ));
            }
        }
    }
}

fn build_sources(message: &Message) -> Option<gtk::Widget> {
    let links: Vec<String> = relevant_sources(&message.sources)
        .map(|source| {
            format!(
                "<a href=\"{}\">{}</a> ({})",
                glib::markup_escape_text(&source.url),
                glib::markup_escape_text(source.display_title()),
                source.relevance_label()
            )
        })
        .collect();

    if links.is_empty() {
        return None;
    }

    let sources_box = gtk::Box::builder()
        .orientation(gtk::Orientation::Vertical)
        .spacing(2)
        .margin_start(8)
        .margin_end(8)
        .margin_bottom(8)
        .build();
    sources_box.add_css_class("message-sources");

    let heading = gtk::Label::builder()
        .label("Sources")
        .halign(gtk::Align::Start)
        .build();
    heading.add_css_class("caption-heading");
    sources_box.append(&heading);

    for link in links {
        let label = gtk::Label::builder()
            .halign(gtk::Align::Start)
            .wrap(true)
            .use_markup(true)
            .build();
        label.set_markup(&link);
        label.add_css_class("caption");
        sources_box.append(&label);
    }

    Some(sources_box.upcast())
}

fn render_markdown_blocks(content_box: &gtk::Box, text: &str) {
    while let Some(child) = content_box.first_child() {
        content_box.remove(&child);
    }

    for block in parse_markdown(text) {
        content_box.append(&block_to_widget(&block));
    }
}

fn markup_label(spans: &[InlineSpan]) -> gtk::Label {
    let label = gtk::Label::builder()
        .halign(gtk::Align::Start)
        .wrap(true)
        .wrap_mode(gtk::pango::WrapMode::WordChar)
        .selectable(true)
        .use_markup(true)
        .build();
    label.set_markup(&spans_to_pango_markup(spans));
    label
}

fn block_to_widget(block: &MessageBlock) -> gtk::Widget {
    match block {
        MessageBlock::RichText(spans) => markup_label(spans).upcast(),
        MessageBlock::CodeBlock { language, code } => build_code_block(language.as_deref(), code),
        MessageBlock::Heading { level, spans } => {
            let label = markup_label(spans);
            label.add_css_class(match level {
                1 => "heading-1",
                2 => "heading-2",
                3 => "heading-3",
                _ => "heading-4",
            });
            label.upcast()
        }
        MessageBlock::BlockQuote(inner_blocks) => {
            let bq_box = gtk::Box::builder()
                .orientation(gtk::Orientation::Vertical)
                .spacing(4)
                .build();
            bq_box.add_css_class("blockquote");
            for inner_block in inner_blocks {
                bq_box.append(&block_to_widget(inner_block));
            }
            bq_box.upcast()
        }
        MessageBlock::UnorderedList(items) => build_list(items, false),
        MessageBlock::OrderedList(items) => build_list(items, true),
        MessageBlock::Table { header, rows } => build_table(header, rows),
        MessageBlock::HorizontalRule => gtk::Separator::builder()
            .orientation(gtk::Orientation::Horizontal)
            .margin_top(4)
            .margin_bottom(4)
            .build()
            .upcast(),
    }
}

fn build_code_block(language: Option<&str>, code: &str) -> gtk::Widget {
    let outer = gtk::Box::builder()
        .orientation(gtk::Orientation::Vertical)
        .margin_top(4)
        .margin_bottom(4)
        .build();
    outer.add_css_class("code-block");

    let header = gtk::Box::builder()
        .orientation(gtk::Orientation::Horizontal)
        .spacing(8)
        .build();
    header.add_css_class("code-block-header");

    let lang_label = gtk::Label::builder()
        .label(language.unwrap_or(""))
        .halign(gtk::Align::Start)
        .hexpand(true)
        .build();
    lang_label.add_css_class("code-block-language");
    header.append(&lang_label);

    let copy_button = gtk::Button::builder()
        .icon_name("edit-copy-symbolic")
        .tooltip_text("Copy code")
        .build();
    copy_button.add_css_class("flat");
    copy_button.add_css_class("circular");

    let code_for_copy = code.to_string();
    copy_button.connect_clicked(move |btn| {
        if let Some(display) = gtk::gdk::Display::default() {
            display.clipboard().set_text(&code_for_copy);
            btn.set_icon_name("object-select-symbolic");
            let btn_clone = btn.clone();
            glib::timeout_add_local_once(std::time::Duration::from_millis(1500), move || {
                // The block may have been rebuilt in the meantime.
                if btn_clone.parent().is_some() {
                    btn_clone.set_icon_name("edit-copy-symbolic");
                }
            });
        }
    });
    header.append(&copy_button);
    outer.append(&header);

    let text_view = gtk::TextView::builder()
        .editable(false)
        .cursor_visible(false)
        .wrap_mode(gtk::WrapMode::WordChar)
        .monospace(true)
        .top_margin(8)
        .bottom_margin(8)
        .left_margin(12)
        .right_margin(12)
        .build();
    text_view.buffer().set_text(code);
    text_view.add_css_class("code-block-content");
    outer.append(&text_view);

    outer.upcast()
}

fn build_list(items: &[Vec<MessageBlock>], ordered: bool) -> gtk::Widget {
    let list_box = gtk::Box::builder()
        .orientation(gtk::Orientation::Vertical)
        .spacing(2)
        .margin_start(4)
        .build();

    for (i, item_blocks) in items.iter().enumerate() {
        let item_row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(4)
            .build();

        let bullet_text = if ordered {
            format!("{}.", i + 1)
        } else {
            "\u{2022}".to_string()
        };
        let bullet = gtk::Label::builder()
            .label(&bullet_text)
            .valign(gtk::Align::Start)
            .build();
        bullet.add_css_class("list-bullet");
        item_row.append(&bullet);

        let item_content = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(2)
            .build();
        for block in item_blocks {
            item_content.append(&block_to_widget(block));
        }

        item_row.append(&item_content);
        list_box.append(&item_row);
    }

    list_box.upcast()
}

fn build_table(header: &[Vec<InlineSpan>], rows: &[Vec<Vec<InlineSpan>>]) -> gtk::Widget {
    let grid = gtk::Grid::builder()
        .column_spacing(12)
        .row_spacing(4)
        .margin_top(4)
        .margin_bottom(4)
        .build();
    grid.add_css_class("markdown-table");

    for (col, cell) in header.iter().enumerate() {
        let label = markup_label(cell);
        label.add_css_class("heading");
        grid.attach(&label, col as i32, 0, 1, 1);
    }

    for (row_index, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            grid.attach(&markup_label(cell), col as i32, row_index as i32 + 1, 1, 1);
        }
    }

    let scroller = gtk::ScrolledWindow::builder()
        .hscrollbar_policy(gtk::PolicyType::Automatic)
        .vscrollbar_policy(gtk::PolicyType::Never)
        .propagate_natural_height(true)
        .child(&grid)
        .build();
    scroller.upcast()
}

pub fn spans_to_pango_markup(spans: &[InlineSpan]) -> String {
    let mut markup = String::new();

    for span in spans {
        let mut text = glib::markup_escape_text(&span.text).to_string();

        if span.code {
            text = format!("<tt>{}</tt>", text);
        }
        if span.bold {
            text = format!("<b>{}</b>", text);
        }
        if span.italic {
            text = format!("<i>{}</i>", text);
        }
        if span.strikethrough {
            text = format!("<s>{}</s>", text);
        }
        if let Some(url) = &span.link_url {
            text = format!("<a href=\"{}\">{}</a>", glib::markup_escape_text(url), text);
        }

        markup.push_str(&text);
    }

    markup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str) -> InlineSpan {
        InlineSpan {
            text: text.to_string(),
            bold: false,
            italic: false,
            strikethrough: false,
            code: false,
            link_url: None,
        }
    }

    #[test]
    fn test_pango_markup_escapes_text() {
        let markup = spans_to_pango_markup(&[span("a < b & c")]);
        assert_eq!(markup, "a &lt; b &amp; c");
    }

    #[test]
    fn test_pango_markup_nests_styles_inside_links() {
        let mut bold_link = span("docs");
        bold_link.bold = true;
        bold_link.link_url = Some("https://example.com/?a=1&b=2".to_string());

        let markup = spans_to_pango_markup(&[bold_link]);
        assert_eq!(
            markup,
            "<a href=\"https://example.com/?a=1&amp;b=2\"><b>docs</b></a>"
        );
    }
}
