use gtk::prelude::*;
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;

use docs_chat::models::Message;

use crate::ui::input_area::{InputArea, InputAreaMsg, InputAreaOutput};
use crate::ui::message_widget::{MessageWidget, MessageWidgetOutput};

/// Text that depends on the active collection.
#[derive(Debug, Clone)]
pub struct Branding {
    pub title: String,
    pub placeholder: String,
    pub disclaimer: String,
}

pub struct ChatView {
    messages: FactoryVecDeque<MessageWidget>,
    input_area: Controller<InputArea>,
    loading: bool,
    scrolled_window: gtk::ScrolledWindow,
    user_scrolled_up: bool,
    branding: Branding,
}

#[derive(Debug)]
pub enum ChatViewMsg {
    AddMessage(Message),
    LoadMessages(Vec<Message>),
    SetLoading(bool),
    SetBranding(Branding),
    ScrollToBottom,
    // Internal
    ScrollPositionChanged,
    UserSendMessage(String),
    CopyToClipboard(String),
}

#[derive(Debug)]
pub enum ChatViewOutput {
    SendMessage(String),
}

#[relm4::component(pub)]
impl Component for ChatView {
    type Init = Branding;
    type Input = ChatViewMsg;
    type Output = ChatViewOutput;
    type CommandOutput = ();

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_vexpand: true,

            adw::StatusPage {
                set_vexpand: true,
                set_icon_name: Some("help-faq-symbolic"),
                set_title: "How can I help you today?",
                #[watch]
                set_description: Some(&format!(
                    "Ask anything about {} and get answers with links to the relevant pages.",
                    model.branding.title
                )),
                #[watch]
                set_visible: model.messages.is_empty(),
            },

            gtk::Overlay {
                set_vexpand: true,
                #[watch]
                set_visible: !model.messages.is_empty(),

                #[local_ref]
                scrolled_window -> gtk::ScrolledWindow {
                    set_vexpand: true,
                    set_hscrollbar_policy: gtk::PolicyType::Never,

                    adw::Clamp {
                        set_maximum_size: 900,

                        #[local_ref]
                        message_list -> gtk::Box {
                            set_orientation: gtk::Orientation::Vertical,
                            set_spacing: 0,
                            set_margin_top: 8,
                            set_margin_bottom: 8,
                        },
                    },
                },

                add_overlay = &gtk::Button {
                    set_icon_name: "go-down-symbolic",
                    set_tooltip_text: Some("Scroll to bottom"),
                    set_halign: gtk::Align::Center,
                    set_valign: gtk::Align::End,
                    set_margin_bottom: 12,
                    add_css_class: "circular",
                    add_css_class: "osd",
                    add_css_class: "scroll-to-bottom",
                    #[watch]
                    set_visible: model.user_scrolled_up,
                    connect_clicked => ChatViewMsg::ScrollToBottom,
                },
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_halign: gtk::Align::Start,
                set_margin_start: 20,
                set_margin_bottom: 8,
                set_spacing: 8,
                add_css_class: "typing-indicator",
                #[watch]
                set_visible: model.loading,

                gtk::Spinner {
                    set_spinning: true,
                },

                gtk::Label {
                    set_label: "Thinking…",
                    add_css_class: "dim-label",
                },
            },

            gtk::Separator {
                set_orientation: gtk::Orientation::Horizontal,
            },

            model.input_area.widget().clone(),

            gtk::Label {
                set_wrap: true,
                set_justify: gtk::Justification::Center,
                set_margin_start: 12,
                set_margin_end: 12,
                set_margin_bottom: 8,
                add_css_class: "dim-label",
                add_css_class: "caption",
                #[watch]
                set_label: &model.branding.disclaimer,
            },
        }
    }

    fn init(
        branding: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let messages = FactoryVecDeque::builder()
            .launch(gtk::Box::default())
            .forward(sender.input_sender(), |output| match output {
                MessageWidgetOutput::FollowUp(question) => ChatViewMsg::UserSendMessage(question),
                MessageWidgetOutput::CopyFullContent(content) => {
                    ChatViewMsg::CopyToClipboard(content)
                }
            });

        let input_area = InputArea::builder()
            .launch(branding.placeholder.clone())
            .forward(sender.input_sender(), |output| match output {
                InputAreaOutput::SendMessage(text) => ChatViewMsg::UserSendMessage(text),
            });

        let scrolled_window = gtk::ScrolledWindow::new();

        let model = Self {
            messages,
            input_area,
            loading: false,
            scrolled_window: scrolled_window.clone(),
            user_scrolled_up: false,
            branding,
        };

        let message_list = model.messages.widget();
        let widgets = view_output!();

        let sender_scroll = sender.input_sender().clone();
        scrolled_window
            .vadjustment()
            .connect_value_changed(move |_| {
                sender_scroll.emit(ChatViewMsg::ScrollPositionChanged);
            });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            ChatViewMsg::AddMessage(message) => {
                self.messages.guard().push_back(message);
                self.auto_scroll_to_bottom(&sender);
            }
            ChatViewMsg::LoadMessages(messages) => {
                let mut guard = self.messages.guard();
                guard.clear();
                for message in messages {
                    guard.push_back(message);
                }
                drop(guard);
                sender.input(ChatViewMsg::ScrollToBottom);
            }
            ChatViewMsg::SetLoading(loading) => {
                self.loading = loading;
                self.input_area.emit(InputAreaMsg::SetSending(loading));
                if loading {
                    self.auto_scroll_to_bottom(&sender);
                }
            }
            ChatViewMsg::SetBranding(branding) => {
                self.input_area
                    .emit(InputAreaMsg::SetPlaceholder(branding.placeholder.clone()));
                self.branding = branding;
            }
            ChatViewMsg::ScrollToBottom => {
                self.user_scrolled_up = false;
                let adj = self.scrolled_window.vadjustment();
                glib::idle_add_local_once(move || {
                    adj.set_value(adj.upper());
                });
            }
            ChatViewMsg::ScrollPositionChanged => {
                let adj = self.scrolled_window.vadjustment();
                let at_bottom = adj.value() >= adj.upper() - adj.page_size() - 50.0;
                self.user_scrolled_up = !at_bottom;
            }
            ChatViewMsg::UserSendMessage(text) => {
                if !self.loading {
                    let _ = sender.output(ChatViewOutput::SendMessage(text));
                }
            }
            ChatViewMsg::CopyToClipboard(content) => {
                if let Some(display) = gtk::gdk::Display::default() {
                    display.clipboard().set_text(&content);
                }
            }
        }
    }
}

impl ChatView {
    fn auto_scroll_to_bottom(&mut self, sender: &ComponentSender<Self>) {
        let adj = self.scrolled_window.vadjustment();
        let at_bottom = adj.value() >= adj.upper() - adj.page_size() - 50.0;
        self.user_scrolled_up = !at_bottom;

        if !self.user_scrolled_up {
            sender.input(ChatViewMsg::ScrollToBottom);
        }
    }
}
