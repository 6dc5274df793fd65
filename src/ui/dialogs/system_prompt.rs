use adw::prelude::*;
use relm4::prelude::*;

pub struct SystemPromptDialog {
    buffer: gtk::TextBuffer,
    busy: bool,
}

#[derive(Debug)]
pub enum SystemPromptMsg {
    Save,
    Cancel,
    Reset,
    /// Replaces the editor contents, e.g. after a reset.
    SetText(String),
    SetBusy(bool),
    Close,
}

#[derive(Debug)]
pub enum SystemPromptOutput {
    Save(String),
    Reset,
    Closed,
}

#[relm4::component(pub, async)]
impl AsyncComponent for SystemPromptDialog {
    type Init = String;
    type Input = SystemPromptMsg;
    type Output = SystemPromptOutput;
    type CommandOutput = ();

    view! {
        adw::Window {
            set_title: Some("System Prompt"),
            set_default_width: 560,
            set_default_height: 440,
            set_modal: true,

            connect_close_request[sender] => move |_| {
                let _ = sender.output(SystemPromptOutput::Closed);
                glib::Propagation::Proceed
            },

            adw::ToolbarView {
                add_top_bar = &adw::HeaderBar {
                    set_show_end_title_buttons: false,

                    pack_start = &gtk::Button {
                        set_label: "Cancel",
                        connect_clicked => SystemPromptMsg::Cancel,
                    },
                    pack_end = &gtk::Button {
                        set_label: "Save",
                        add_css_class: "suggested-action",
                        #[watch]
                        set_sensitive: !model.busy,
                        connect_clicked => SystemPromptMsg::Save,
                    },
                },

                #[wrap(Some)]
                set_content = &gtk::Box {
                    set_orientation: gtk::Orientation::Vertical,
                    set_spacing: 12,
                    set_margin_all: 12,

                    gtk::Label {
                        set_label: "The system prompt tells the assistant how to answer. It is sent with every question and shared by all conversations.",
                        set_wrap: true,
                        set_halign: gtk::Align::Start,
                        add_css_class: "dim-label",
                    },

                    gtk::ScrolledWindow {
                        set_vexpand: true,
                        set_hscrollbar_policy: gtk::PolicyType::Never,

                        #[name = "text_view"]
                        gtk::TextView {
                            set_wrap_mode: gtk::WrapMode::WordChar,
                            set_top_margin: 8,
                            set_bottom_margin: 8,
                            set_left_margin: 8,
                            set_right_margin: 8,
                            add_css_class: "card",
                            #[watch]
                            set_editable: !model.busy,
                        },
                    },

                    gtk::Button {
                        set_label: "Reset to Default",
                        set_halign: gtk::Align::Start,
                        add_css_class: "destructive-action",
                        #[watch]
                        set_sensitive: !model.busy,
                        connect_clicked => SystemPromptMsg::Reset,
                    },
                },
            },
        }
    }

    async fn init(
        current_prompt: Self::Init,
        root: Self::Root,
        sender: AsyncComponentSender<Self>,
    ) -> AsyncComponentParts<Self> {
        let buffer = gtk::TextBuffer::new(None::<&gtk::TextTagTable>);
        buffer.set_text(&current_prompt);

        let model = Self {
            buffer: buffer.clone(),
            busy: false,
        };

        let widgets = view_output!();
        widgets.text_view.set_buffer(Some(&buffer));

        AsyncComponentParts { model, widgets }
    }

    async fn update(
        &mut self,
        msg: Self::Input,
        sender: AsyncComponentSender<Self>,
        root: &Self::Root,
    ) {
        match msg {
            SystemPromptMsg::Save => {
                let start = self.buffer.start_iter();
                let end = self.buffer.end_iter();
                let text = self.buffer.text(&start, &end, false).to_string();
                self.busy = true;
                let _ = sender.output(SystemPromptOutput::Save(text));
            }
            SystemPromptMsg::Reset => {
                self.busy = true;
                let _ = sender.output(SystemPromptOutput::Reset);
            }
            SystemPromptMsg::SetText(text) => {
                self.buffer.set_text(&text);
            }
            SystemPromptMsg::SetBusy(busy) => {
                self.busy = busy;
            }
            SystemPromptMsg::Cancel | SystemPromptMsg::Close => {
                root.close();
            }
        }
    }
}
