use adw::prelude::*;
use chrono::{DateTime, Datelike, Utc};
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;

use docs_chat::models::Conversation;
use docs_chat::services::export::ExportFormat;

/// What the sidebar needs to know about a conversation.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            created_at: conversation.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SidebarItem {
    Header(&'static str),
    Conversation(ConversationSummary),
}

// --- ConversationRow factory component ---

#[derive(Debug)]
pub struct ConversationRow {
    pub item: SidebarItem,
}

#[derive(Debug)]
pub enum ConversationRowOutput {
    Delete(String),
}

#[relm4::factory(pub)]
impl FactoryComponent for ConversationRow {
    type Init = SidebarItem;
    type Input = ();
    type Output = ConversationRowOutput;
    type CommandOutput = ();
    type ParentWidget = gtk::ListBox;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Horizontal,
            set_spacing: 4,
            set_margin_all: 4,
        }
    }

    fn init_model(item: Self::Init, _index: &DynamicIndex, _sender: FactorySender<Self>) -> Self {
        Self { item }
    }

    fn init_widgets(
        &mut self,
        _index: &DynamicIndex,
        root: Self::Root,
        returned_widget: &<Self::ParentWidget as relm4::factory::FactoryView>::ReturnedWidget,
        sender: FactorySender<Self>,
    ) -> Self::Widgets {
        match &self.item {
            SidebarItem::Header(label) => {
                let header_label = gtk::Label::builder()
                    .label(*label)
                    .halign(gtk::Align::Start)
                    .margin_top(8)
                    .margin_start(4)
                    .build();
                header_label.add_css_class("dim-label");
                header_label.add_css_class("caption");
                header_label.add_css_class("sidebar-date-header");
                root.append(&header_label);

                returned_widget.set_activatable(false);
                returned_widget.set_selectable(false);
            }
            SidebarItem::Conversation(conv) => {
                let title_label = gtk::Label::builder()
                    .label(&conv.title)
                    .halign(gtk::Align::Start)
                    .hexpand(true)
                    .ellipsize(gtk::pango::EllipsizeMode::End)
                    .max_width_chars(30)
                    .tooltip_text(&conv.title)
                    .build();
                root.append(&title_label);

                let delete_button = gtk::Button::builder()
                    .icon_name("user-trash-symbolic")
                    .tooltip_text("Delete Conversation")
                    .valign(gtk::Align::Center)
                    .build();
                delete_button.add_css_class("flat");
                delete_button.add_css_class("circular");
                delete_button.add_css_class("sidebar-delete");

                let id = conv.id.clone();
                delete_button.connect_clicked(move |_| {
                    let _ = sender.output(ConversationRowOutput::Delete(id.clone()));
                });
                root.append(&delete_button);
            }
        }

        let widgets = view_output!();
        widgets
    }
}

// --- Sidebar component ---

pub struct Sidebar {
    conversations: FactoryVecDeque<ConversationRow>,
    active_id: Option<String>,
    search_term: String,
}

#[derive(Debug)]
pub enum SidebarMsg {
    SetConversations {
        conversations: Vec<ConversationSummary>,
        active_id: Option<String>,
    },
    NewChat,
    RowActivated(usize),
    ShowContextMenu(f64, f64, usize),
    DeleteConversation(String),
    ExportConversation(usize, ExportFormat),
    SearchChanged(String),
    OpenSystemPrompt,
}

#[derive(Debug)]
pub enum SidebarOutput {
    NewChat,
    ConversationSelected(String),
    DeleteConversation(String),
    ExportConversation(String, ExportFormat),
    OpenSystemPrompt,
}

#[relm4::component(pub)]
impl Component for Sidebar {
    type Init = ();
    type Input = SidebarMsg;
    type Output = SidebarOutput;
    type CommandOutput = ();

    view! {
        adw::ToolbarView {
            add_top_bar = &adw::HeaderBar {
                set_show_end_title_buttons: false,

                pack_start = &gtk::Button {
                    set_icon_name: "list-add-symbolic",
                    set_tooltip_text: Some("New Chat"),
                    connect_clicked => SidebarMsg::NewChat,
                },

                #[wrap(Some)]
                set_title_widget = &adw::WindowTitle {
                    set_title: "Conversations",
                },
            },

            #[wrap(Some)]
            set_content = &gtk::Box {
                set_orientation: gtk::Orientation::Vertical,

                gtk::SearchEntry {
                    set_placeholder_text: Some("Search conversations..."),
                    set_margin_start: 8,
                    set_margin_end: 8,
                    set_margin_top: 4,
                    set_margin_bottom: 4,
                    connect_search_changed[sender] => move |entry| {
                        sender.input(SidebarMsg::SearchChanged(entry.text().to_string()));
                    },
                },

                gtk::ScrolledWindow {
                    set_hscrollbar_policy: gtk::PolicyType::Never,
                    set_vexpand: true,

                    #[local_ref]
                    conversation_list -> gtk::ListBox {
                        set_selection_mode: gtk::SelectionMode::Single,
                        add_css_class: "navigation-sidebar",
                    },
                },
            },

            add_bottom_bar = &gtk::Button {
                set_margin_all: 8,
                add_css_class: "flat",
                set_tooltip_text: Some("Customize how the assistant responds"),
                connect_clicked => SidebarMsg::OpenSystemPrompt,

                #[wrap(Some)]
                set_child = &adw::ButtonContent {
                    set_icon_name: "emblem-system-symbolic",
                    set_label: "System Prompt",
                },
            },
        }
    }

    fn init(
        _init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let conversations = FactoryVecDeque::builder()
            .launch(gtk::ListBox::default())
            .forward(sender.input_sender(), |output| match output {
                ConversationRowOutput::Delete(id) => SidebarMsg::DeleteConversation(id),
            });

        let model = Self {
            conversations,
            active_id: None,
            search_term: String::new(),
        };

        let conversation_list = model.conversations.widget();
        let widgets = view_output!();

        let sender_activate = sender.clone();
        model.conversations.widget().connect_row_activated(move |_, row| {
            sender_activate.input(SidebarMsg::RowActivated(row.index() as usize));
        });

        let gesture = gtk::GestureClick::new();
        gesture.set_button(3);
        let list = model.conversations.widget().clone();
        let sender_menu = sender.clone();
        gesture.connect_released(move |_, _, x, y| {
            if let Some(row) = list.row_at_y(y as i32) {
                sender_menu.input(SidebarMsg::ShowContextMenu(x, y, row.index() as usize));
            }
        });
        model.conversations.widget().add_controller(gesture);

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            SidebarMsg::SetConversations {
                conversations,
                active_id,
            } => {
                let mut guard = self.conversations.guard();
                guard.clear();

                let mut current_group = None;
                for conv in conversations {
                    let group = date_group(&conv.created_at);
                    if current_group != Some(group) {
                        current_group = Some(group);
                        guard.push_back(SidebarItem::Header(group));
                    }
                    guard.push_back(SidebarItem::Conversation(conv));
                }
                drop(guard);

                self.active_id = active_id;
                self.apply_search_filter();
                self.select_active_row();
            }
            SidebarMsg::NewChat => {
                let _ = sender.output(SidebarOutput::NewChat);
            }
            SidebarMsg::RowActivated(index) => {
                if let Some(id) = self.conversation_id_at(index) {
                    let _ = sender.output(SidebarOutput::ConversationSelected(id));
                }
            }
            SidebarMsg::ShowContextMenu(x, y, index) => {
                if self.conversation_id_at(index).is_some() {
                    self.show_context_menu(x, y, index, &sender);
                }
            }
            SidebarMsg::DeleteConversation(id) => {
                let _ = sender.output(SidebarOutput::DeleteConversation(id));
            }
            SidebarMsg::ExportConversation(index, format) => {
                if let Some(id) = self.conversation_id_at(index) {
                    let _ = sender.output(SidebarOutput::ExportConversation(id, format));
                }
            }
            SidebarMsg::SearchChanged(term) => {
                self.search_term = term.to_lowercase();
                self.apply_search_filter();
            }
            SidebarMsg::OpenSystemPrompt => {
                let _ = sender.output(SidebarOutput::OpenSystemPrompt);
            }
        }
    }
}

impl Sidebar {
    fn conversation_id_at(&self, index: usize) -> Option<String> {
        match &self.conversations.get(index)?.item {
            SidebarItem::Conversation(conv) => Some(conv.id.clone()),
            SidebarItem::Header(_) => None,
        }
    }

    fn select_active_row(&self) {
        let list = self.conversations.widget();
        let active_id = self.active_id.as_deref();
        let position = self.conversations.iter().position(|row| match &row.item {
            SidebarItem::Conversation(c) => Some(c.id.as_str()) == active_id,
            SidebarItem::Header(_) => false,
        });

        match position.and_then(|i| list.row_at_index(i as i32)) {
            Some(row) => list.select_row(Some(&row)),
            None => list.unselect_all(),
        }
    }

    fn show_context_menu(&self, x: f64, y: f64, index: usize, sender: &ComponentSender<Self>) {
        let list_widget = self.conversations.widget();

        let menu = gio::Menu::new();
        menu.append(Some("Export as HTML…"), Some("sidebar.export-html"));
        menu.append(Some("Export as Markdown…"), Some("sidebar.export-markdown"));
        menu.append(Some("Delete"), Some("sidebar.delete"));

        let action_group = gio::SimpleActionGroup::new();

        for (name, format) in [
            ("export-html", ExportFormat::Html),
            ("export-markdown", ExportFormat::Markdown),
        ] {
            let input = sender.input_sender().clone();
            let action = gio::SimpleAction::new(name, None);
            action.connect_activate(move |_, _| {
                input.emit(SidebarMsg::ExportConversation(index, format));
            });
            action_group.add_action(&action);
        }

        if let Some(id) = self.conversation_id_at(index) {
            let input = sender.input_sender().clone();
            let delete_action = gio::SimpleAction::new("delete", None);
            delete_action.connect_activate(move |_, _| {
                input.emit(SidebarMsg::DeleteConversation(id.clone()));
            });
            action_group.add_action(&delete_action);
        }

        list_widget.insert_action_group("sidebar", Some(&action_group));

        let popover = gtk::PopoverMenu::from_model(Some(&menu));
        popover.set_parent(list_widget);
        popover.set_pointing_to(Some(&gtk::gdk::Rectangle::new(x as i32, y as i32, 1, 1)));
        popover.set_has_arrow(true);

        // Unparent on idle so the chosen action still sees its group.
        let parent = list_widget.clone();
        popover.connect_closed(move |p| {
            let popover = p.clone();
            let parent = parent.clone();
            glib::idle_add_local_once(move || {
                popover.unparent();
                parent.insert_action_group("sidebar", None::<&gio::SimpleActionGroup>);
            });
        });

        popover.popup();
    }

    fn apply_search_filter(&self) {
        let is_searching = !self.search_term.is_empty();
        let list_widget = self.conversations.widget();

        for (i, row_data) in self.conversations.iter().enumerate() {
            let visible = match &row_data.item {
                SidebarItem::Header(_) => !is_searching,
                SidebarItem::Conversation(conv) => {
                    !is_searching || conv.title.to_lowercase().contains(&self.search_term)
                }
            };
            if let Some(row) = list_widget.row_at_index(i as i32) {
                row.set_visible(visible);
            }
        }
    }
}

fn date_group(dt: &DateTime<Utc>) -> &'static str {
    let today = Utc::now().date_naive();
    let date = dt.date_naive();

    if date == today {
        "Today"
    } else if date == today.pred_opt().unwrap_or(today) {
        "Yesterday"
    } else if date.iso_week() == today.iso_week() && date.year() == today.year() {
        "This Week"
    } else {
        "Older"
    }
}
