use std::sync::Arc;

use adw::prelude::*;
use bytes::Bytes;
use futures::future::BoxFuture;
use relm4::prelude::*;
use tokio::sync::{Mutex, OwnedMutexGuard};

use docs_chat::api::{ApiError, ChatApi, ChatReply, DocsApiClient};
use docs_chat::config::{self, Config};
use docs_chat::models::{CollectionMetadata, Conversation, Message};
use docs_chat::services::export::ExportFormat;
use docs_chat::services::{
    AppSettings, ChatSession, CollectionState, ConversationStore, Database, SendTicket,
    SettingsService, SystemPromptState,
};

use crate::ui::chat_view::{Branding, ChatView, ChatViewMsg, ChatViewOutput};
use crate::ui::dialogs::system_prompt::{SystemPromptDialog, SystemPromptMsg, SystemPromptOutput};
use crate::ui::sidebar::{ConversationSummary, Sidebar, SidebarMsg, SidebarOutput};
use crate::ui::window;

type SharedStore = Arc<Mutex<ConversationStore>>;
type StoreGuard = OwnedMutexGuard<ConversationStore>;

pub struct AppInit {
    pub config: Config,
    pub api: Arc<DocsApiClient>,
}

pub struct App {
    api: Arc<DocsApiClient>,
    store: SharedStore,
    session: ChatSession,
    prompt: SystemPromptState,
    collection: CollectionState,
    db: Option<Database>,
    settings: AppSettings,
    /// Collection named on the command line; wins over the remembered one.
    startup_collection: Option<String>,
    active_id: Option<String>,
    sidebar: Controller<Sidebar>,
    chat_view: Controller<ChatView>,
    system_prompt_dialog: Option<AsyncController<SystemPromptDialog>>,
    toast_overlay: adw::ToastOverlay,
    split_view: adw::OverlaySplitView,
    banner: adw::Banner,
    window_title: adw::WindowTitle,
    logo: gtk::Image,
    error_generation: u64,
}

/// What the UI needs from the store after each change.
#[derive(Debug)]
pub struct StoreSnapshot {
    conversations: Vec<ConversationSummary>,
    active_id: Option<String>,
    active: Option<Conversation>,
}

impl StoreSnapshot {
    fn capture(store: &ConversationStore) -> Self {
        Self {
            conversations: store.list().iter().map(ConversationSummary::from).collect(),
            active_id: store.active_id().map(str::to_string),
            active: store.active().cloned(),
        }
    }
}

#[derive(Debug)]
pub enum AppMsg {
    NewChat,
    ConversationSelected(String),
    DeleteConversation(String),
    ExportConversation(String, ExportFormat),
    ExportActive(ExportFormat),
    SendMessage(String),
    ClearChat,
    OpenCollectionDialog,
    CollectionChosen(Option<String>),
    ShowSystemPromptDialog,
    SaveSystemPrompt(String),
    ResetSystemPrompt,
    SystemPromptClosed,
    ToggleSidebar,
    DismissError,
    ErrorTimeout(u64),
    ShowShortcuts,
    ShowAbout,
    Quit,
}

#[derive(Debug)]
pub enum AppCmd {
    SettingsLoaded(Option<Database>, AppSettings),
    StoreChanged(StoreSnapshot),
    /// Session cookie held by the client after a store operation.
    SessionSeen(Option<String>),
    SystemPromptLoaded(Result<String, ApiError>),
    MetadataLoaded(Option<String>, CollectionMetadata),
    LogoLoaded(String, Result<Bytes, ApiError>),
    ChatReplied(SendTicket, Result<ChatReply, ApiError>),
    PromptSaved(String, Result<(), ApiError>),
    PromptReset(Result<String, ApiError>),
    ExportReady(Conversation, ExportFormat),
}

#[relm4::component(pub, async)]
impl AsyncComponent for App {
    type Init = AppInit;
    type Input = AppMsg;
    type Output = ();
    type CommandOutput = AppCmd;

    view! {
        adw::ApplicationWindow {
            set_title: Some(config::APP_NAME),
            set_default_width: 1100,
            set_default_height: 780,
            set_width_request: 360,
            set_height_request: 480,

            #[local_ref]
            toast_overlay -> adw::ToastOverlay {},
        }
    }

    async fn init(
        init: Self::Init,
        root: Self::Root,
        sender: AsyncComponentSender<Self>,
    ) -> AsyncComponentParts<Self> {
        let api = init.api;
        let store = Arc::new(Mutex::new(ConversationStore::new(api.clone())));
        let collection = CollectionState::new(None);

        let sidebar = Sidebar::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                SidebarOutput::NewChat => AppMsg::NewChat,
                SidebarOutput::ConversationSelected(id) => AppMsg::ConversationSelected(id),
                SidebarOutput::DeleteConversation(id) => AppMsg::DeleteConversation(id),
                SidebarOutput::ExportConversation(id, format) => {
                    AppMsg::ExportConversation(id, format)
                }
                SidebarOutput::OpenSystemPrompt => AppMsg::ShowSystemPromptDialog,
            });

        let chat_view = ChatView::builder()
            .launch(branding(&collection))
            .forward(sender.input_sender(), |output| match output {
                ChatViewOutput::SendMessage(text) => AppMsg::SendMessage(text),
            });

        let toast_overlay = adw::ToastOverlay::new();
        toast_overlay.set_hexpand(true);
        toast_overlay.set_vexpand(true);

        // Header: sidebar toggle, logo + title, main menu
        let content_header = adw::HeaderBar::new();

        let sidebar_button = gtk::Button::builder()
            .icon_name("sidebar-show-symbolic")
            .tooltip_text("Toggle Sidebar (F9)")
            .build();
        let sender_toggle = sender.input_sender().clone();
        sidebar_button.connect_clicked(move |_| {
            sender_toggle.emit(AppMsg::ToggleSidebar);
        });
        content_header.pack_start(&sidebar_button);

        let logo = gtk::Image::builder().pixel_size(24).visible(false).build();
        logo.add_css_class("collection-logo");
        let window_title = adw::WindowTitle::new(&collection.metadata().title, "");
        let title_box = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        title_box.append(&logo);
        title_box.append(&window_title);
        content_header.set_title_widget(Some(&title_box));

        let menu = gio::Menu::new();
        let chat_section = gio::Menu::new();
        chat_section.append(Some("Open Collection…"), Some("app.open-collection"));
        chat_section.append(Some("Clear Chat"), Some("app.clear-chat"));
        chat_section.append(Some("System Prompt…"), Some("app.system-prompt"));
        menu.append_section(None, &chat_section);
        let export_section = gio::Menu::new();
        export_section.append(Some("Export as HTML…"), Some("app.export-html"));
        export_section.append(Some("Export as Markdown…"), Some("app.export-markdown"));
        menu.append_section(None, &export_section);
        let help_section = gio::Menu::new();
        help_section.append(Some("Keyboard Shortcuts"), Some("app.show-shortcuts"));
        help_section.append(Some("About Docs Chat"), Some("app.about"));
        menu.append_section(None, &help_section);

        let menu_button = gtk::MenuButton::builder()
            .icon_name("open-menu-symbolic")
            .menu_model(&menu)
            .tooltip_text("Main Menu")
            .build();
        content_header.pack_end(&menu_button);

        let banner = adw::Banner::builder().button_label("Dismiss").build();
        let sender_dismiss = sender.input_sender().clone();
        banner.connect_button_clicked(move |_| {
            sender_dismiss.emit(AppMsg::DismissError);
        });

        let content_toolbar = adw::ToolbarView::new();
        content_toolbar.add_top_bar(&content_header);
        content_toolbar.add_top_bar(&banner);
        content_toolbar.set_content(Some(chat_view.widget()));

        let split_view = adw::OverlaySplitView::new();
        split_view.set_hexpand(true);
        split_view.set_vexpand(true);
        split_view.set_min_sidebar_width(220.0);
        split_view.set_max_sidebar_width(300.0);
        split_view.set_sidebar(Some(sidebar.widget()));
        split_view.set_content(Some(&content_toolbar));

        match adw::BreakpointCondition::parse("max-width: 640px") {
            Ok(condition) => {
                let breakpoint = adw::Breakpoint::new(condition);
                breakpoint.add_setter(&split_view, "collapsed", Some(&true.to_value()));
                root.add_breakpoint(breakpoint);
            }
            Err(e) => tracing::warn!("Invalid breakpoint condition: {}", e),
        }

        toast_overlay.set_child(Some(&split_view));

        let model = App {
            api,
            store,
            session: ChatSession::new(),
            prompt: SystemPromptState::new(),
            collection,
            db: None,
            settings: AppSettings::default(),
            startup_collection: init.config.collection,
            active_id: None,
            sidebar,
            chat_view,
            system_prompt_dialog: None,
            toast_overlay: toast_overlay.clone(),
            split_view,
            banner,
            window_title,
            logo,
            error_generation: 0,
        };

        let widgets = view_output!();

        let app = relm4::main_adw_application();
        let input = sender.input_sender();
        register_action(&app, input, "new-chat", &["<Control>n"], || AppMsg::NewChat);
        register_action(&app, input, "open-collection", &["<Control>o"], || {
            AppMsg::OpenCollectionDialog
        });
        register_action(&app, input, "clear-chat", &["<Control>l"], || AppMsg::ClearChat);
        register_action(&app, input, "system-prompt", &["<Control>comma"], || {
            AppMsg::ShowSystemPromptDialog
        });
        register_action(&app, input, "toggle-sidebar", &["F9"], || AppMsg::ToggleSidebar);
        register_action(&app, input, "export-html", &[], || {
            AppMsg::ExportActive(ExportFormat::Html)
        });
        register_action(&app, input, "export-markdown", &[], || {
            AppMsg::ExportActive(ExportFormat::Markdown)
        });
        register_action(&app, input, "show-shortcuts", &["<Control>question"], || {
            AppMsg::ShowShortcuts
        });
        register_action(&app, input, "about", &[], || AppMsg::ShowAbout);
        register_action(&app, input, "quit", &["<Control>q"], || AppMsg::Quit);

        // Conversations are scoped to the remembered server session, so they load after settings.
        let api = model.api.clone();
        let store = model.store.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let (db, settings) = match Database::new().await {
                    Ok(db) => {
                        let settings = SettingsService::load(&db).await;
                        (Some(db), settings)
                    }
                    Err(e) => {
                        tracing::error!("Failed to open settings database: {}", e);
                        (None, AppSettings::default())
                    }
                };
                if let Some(session_id) = settings.session_id.as_deref() {
                    api.restore_session(session_id);
                }
                out.emit(AppCmd::SettingsLoaded(db, settings));

                let mut store = store.lock().await;
                store.load().await;
                out.emit(AppCmd::StoreChanged(StoreSnapshot::capture(&store)));
                out.emit(AppCmd::SessionSeen(api.session_id()));
            })
        });

        let api = model.api.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                out.emit(AppCmd::SystemPromptLoaded(api.fetch_system_prompt().await));
            })
        });

        AsyncComponentParts { model, widgets }
    }

    async fn update(
        &mut self,
        msg: Self::Input,
        sender: AsyncComponentSender<Self>,
        root: &Self::Root,
    ) {
        match msg {
            AppMsg::NewChat => {
                self.with_store(&sender, |mut store| {
                    Box::pin(async move {
                        store.create().await;
                        store
                    })
                });
            }
            AppMsg::ConversationSelected(id) => {
                if self.active_id.as_deref() == Some(id.as_str()) {
                    return;
                }
                self.with_store(&sender, move |mut store| {
                    Box::pin(async move {
                        store.select(&id);
                        store
                    })
                });
            }
            AppMsg::DeleteConversation(id) => {
                self.with_store(&sender, move |mut store| {
                    Box::pin(async move {
                        store.delete(&id).await;
                        store
                    })
                });
            }
            AppMsg::ExportConversation(id, format) => {
                let store = self.store.clone();
                sender.command(move |out, _| {
                    Box::pin(async move {
                        let conversation = {
                            let store = store.lock().await;
                            store.list().iter().find(|c| c.id == id).cloned()
                        };
                        match conversation {
                            Some(conversation) => {
                                out.emit(AppCmd::ExportReady(conversation, format));
                            }
                            None => tracing::warn!("Cannot export unknown conversation {}", id),
                        }
                    })
                });
            }
            AppMsg::ExportActive(format) => {
                if let Some(id) = self.active_id.clone() {
                    sender.input(AppMsg::ExportConversation(id, format));
                }
            }
            AppMsg::SendMessage(text) => {
                self.handle_send_message(&text, &sender);
            }
            AppMsg::ClearChat => {
                let target = self.session.conversation_id().map(str::to_string);
                let cleared = self.session.clear_chat();
                self.chat_view.emit(ChatViewMsg::LoadMessages(Vec::new()));
                self.chat_view
                    .emit(ChatViewMsg::SetLoading(self.session.is_loading()));
                self.hide_error();
                self.persist_messages(target, cleared, &sender);
            }
            AppMsg::OpenCollectionDialog => {
                let input = sender.input_sender().clone();
                window::create_collection_dialog(root, self.collection.requested(), move |name| {
                    input.emit(AppMsg::CollectionChosen(name));
                });
            }
            AppMsg::CollectionChosen(name) => {
                if self.collection.set_requested(name) {
                    tracing::info!("Switching collection to {:?}", self.collection.requested());
                    self.apply_branding(root);
                    self.load_collection(&sender);
                    sender.input(AppMsg::ClearChat);

                    self.settings.last_collection = self.collection.requested().map(str::to_string);
                    self.save_settings(&sender);
                }
            }
            AppMsg::ShowSystemPromptDialog => {
                if self.prompt.is_dialog_open() {
                    if let Some(dialog) = &self.system_prompt_dialog {
                        dialog.widget().present();
                    }
                    return;
                }
                self.prompt.open_dialog();
                let dialog = SystemPromptDialog::builder()
                    .launch(self.prompt.edited().to_string())
                    .forward(sender.input_sender(), |output| match output {
                        SystemPromptOutput::Save(text) => AppMsg::SaveSystemPrompt(text),
                        SystemPromptOutput::Reset => AppMsg::ResetSystemPrompt,
                        SystemPromptOutput::Closed => AppMsg::SystemPromptClosed,
                    });
                dialog.widget().set_transient_for(Some(root));
                dialog.widget().present();
                self.system_prompt_dialog = Some(dialog);
            }
            AppMsg::SaveSystemPrompt(text) => {
                self.prompt.set_edited(text);
                let prompt = self.prompt.pending_save();
                let api = self.api.clone();
                sender.command(move |out, _| {
                    Box::pin(async move {
                        let result = api.save_system_prompt(&prompt).await;
                        out.emit(AppCmd::PromptSaved(prompt, result));
                    })
                });
            }
            AppMsg::ResetSystemPrompt => {
                let api = self.api.clone();
                sender.command(move |out, _| {
                    Box::pin(async move {
                        out.emit(AppCmd::PromptReset(api.reset_system_prompt().await));
                    })
                });
            }
            AppMsg::SystemPromptClosed => {
                self.prompt.close_dialog();
                self.system_prompt_dialog = None;
            }
            AppMsg::ToggleSidebar => {
                self.settings.sidebar_collapsed = !self.settings.sidebar_collapsed;
                self.split_view
                    .set_show_sidebar(!self.settings.sidebar_collapsed);
                self.save_settings(&sender);
            }
            AppMsg::DismissError => {
                self.session.clear_error();
                self.hide_error();
            }
            AppMsg::ErrorTimeout(generation) => {
                if generation == self.error_generation {
                    self.session.clear_error();
                    self.hide_error();
                }
            }
            AppMsg::ShowShortcuts => {
                window::create_shortcuts_window(root);
            }
            AppMsg::ShowAbout => {
                window::create_about_dialog(root);
            }
            AppMsg::Quit => {
                root.close();
            }
        }
    }

    async fn update_cmd(
        &mut self,
        msg: Self::CommandOutput,
        sender: AsyncComponentSender<Self>,
        root: &Self::Root,
    ) {
        match msg {
            AppCmd::SettingsLoaded(db, settings) => {
                self.db = db;
                self.split_view.set_show_sidebar(!settings.sidebar_collapsed);

                let requested = self
                    .startup_collection
                    .take()
                    .or_else(|| settings.last_collection.clone());
                self.settings = settings;

                self.collection.set_requested(requested);
                self.apply_branding(root);
                self.load_collection(&sender);
            }
            AppCmd::StoreChanged(snapshot) => {
                self.active_id = snapshot.active_id.clone();
                self.sidebar.emit(SidebarMsg::SetConversations {
                    conversations: snapshot.conversations,
                    active_id: snapshot.active_id,
                });

                if let Some(active) = snapshot.active {
                    if self.session.sync_conversation(&active.id, &active.messages) {
                        self.chat_view
                            .emit(ChatViewMsg::LoadMessages(self.session.messages().to_vec()));
                        self.chat_view
                            .emit(ChatViewMsg::SetLoading(self.session.is_loading()));
                        self.hide_error();
                    }
                }
            }
            AppCmd::SessionSeen(session_id) => {
                if session_id.is_some() && session_id != self.settings.session_id {
                    tracing::debug!("Server session changed, remembering it");
                    self.settings.session_id = session_id;
                    self.save_settings(&sender);
                }
            }
            AppCmd::SystemPromptLoaded(result) => {
                self.prompt.apply_loaded(result);
            }
            AppCmd::MetadataLoaded(requested, metadata) => {
                if self.collection.apply_metadata(requested.as_deref(), metadata) {
                    self.apply_branding(root);
                    self.load_logo(&sender);
                }
            }
            AppCmd::LogoLoaded(url, result) => {
                if url != self.collection.metadata().logo {
                    return;
                }
                match result {
                    Ok(bytes) => {
                        match gtk::gdk::Texture::from_bytes(&glib::Bytes::from(&bytes[..])) {
                            Ok(texture) => {
                                self.logo.set_paintable(Some(&texture));
                                self.logo.set_visible(true);
                            }
                            Err(e) => {
                                tracing::warn!("Unreadable logo at {}: {}", url, e);
                                self.logo.set_visible(false);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch logo {}: {}", url, e);
                        self.logo.set_visible(false);
                    }
                }
            }
            AppCmd::ChatReplied(ticket, result) => {
                let failed = result.is_err();
                let target = ticket.conversation_id().map(str::to_string);
                if let Some(messages) = self.session.complete_send(ticket, result) {
                    if let Some(reply) = messages.last() {
                        self.chat_view.emit(ChatViewMsg::AddMessage(reply.clone()));
                    }
                    self.persist_messages(target, messages, &sender);
                }
                self.chat_view
                    .emit(ChatViewMsg::SetLoading(self.session.is_loading()));

                if failed {
                    if let Some(error) = self.session.error().map(str::to_string) {
                        self.show_error(&error, &sender);
                    }
                }
            }
            AppCmd::PromptSaved(prompt, result) => match self.prompt.apply_saved(prompt, result) {
                Ok(()) => {
                    if !self.prompt.is_dialog_open() {
                        if let Some(dialog) = &self.system_prompt_dialog {
                            dialog.emit(SystemPromptMsg::Close);
                        }
                    }
                    self.show_toast("System prompt saved");
                }
                Err(e) => {
                    tracing::warn!("Failed to save system prompt: {}", e);
                    if let Some(dialog) = &self.system_prompt_dialog {
                        dialog.emit(SystemPromptMsg::SetBusy(false));
                    }
                    let body = e.to_string();
                    window::show_error_dialog(root, "Could Not Save System Prompt", &body);
                }
            },
            AppCmd::PromptReset(result) => {
                let outcome = self.prompt.apply_reset(result);
                if let Some(dialog) = &self.system_prompt_dialog {
                    if outcome.is_ok() {
                        dialog.emit(SystemPromptMsg::SetText(self.prompt.edited().to_string()));
                    }
                    dialog.emit(SystemPromptMsg::SetBusy(false));
                }
                match outcome {
                    Ok(()) => self.show_toast("System prompt reset to default"),
                    Err(e) => {
                        tracing::warn!("Failed to reset system prompt: {}", e);
                        let body = e.to_string();
                        window::show_error_dialog(root, "Could Not Reset System Prompt", &body);
                    }
                }
            }
            AppCmd::ExportReady(conversation, format) => {
                self.export_conversation(&conversation, format, root);
            }
        }
    }

    fn shutdown(&mut self, _widgets: &mut Self::Widgets, _output: relm4::Sender<Self::Output>) {
        let handles = match self.store.try_lock() {
            Ok(mut store) if store.has_pending_write() => {
                tracing::info!("Sending unsaved conversations before exit");
                store.flush_on_teardown()
            }
            Ok(_) => return,
            Err(_) => {
                tracing::warn!("Conversation store busy at exit, unsaved changes may be lost");
                return;
            }
        };

        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("Final conversation save panicked");
            }
        }
    }
}

impl App {
    fn show_toast(&self, message: &str) {
        let toast = adw::Toast::new(message);
        toast.set_timeout(3);
        self.toast_overlay.add_toast(toast);
    }

    /// Runs `op` against the locked store on the command runtime and publishes the result.
    fn with_store<F>(&self, sender: &AsyncComponentSender<Self>, op: F)
    where
        F: FnOnce(StoreGuard) -> BoxFuture<'static, StoreGuard> + Send + 'static,
    {
        let store = self.store.clone();
        let api = self.api.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let store = op(store.lock_owned().await).await;
                out.emit(AppCmd::StoreChanged(StoreSnapshot::capture(&store)));
                out.emit(AppCmd::SessionSeen(api.session_id()));
            })
        });
    }

    /// Saves `messages` into `target`, which may no longer be the active conversation.
    fn persist_messages(
        &self,
        target: Option<String>,
        messages: Arc<Vec<Message>>,
        sender: &AsyncComponentSender<Self>,
    ) {
        let store = self.store.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let timer = {
                    let mut store = store.lock().await;
                    let timer = match target.as_deref() {
                        Some(id) => store.update_messages_for(id, messages),
                        None => store.update_messages(messages),
                    };
                    out.emit(AppCmd::StoreChanged(StoreSnapshot::capture(&store)));
                    timer
                };
                if let Some(timer) = timer {
                    timer.await;
                }
            })
        });
    }

    fn handle_send_message(&mut self, text: &str, sender: &AsyncComponentSender<Self>) {
        let Some(pending) = self.session.begin_send(text) else {
            return;
        };

        if let Some(question) = self.session.messages().last() {
            self.chat_view.emit(ChatViewMsg::AddMessage(question.clone()));
        }
        self.chat_view.emit(ChatViewMsg::SetLoading(true));
        self.hide_error();

        let api = self.api.clone();
        let system_prompt = self.prompt.prompt_for_request().map(str::to_string);
        let collection = self.collection.resolved().map(str::to_string);
        sender.command(move |out, _| {
            Box::pin(async move {
                let result = api
                    .send_message(
                        &pending.content,
                        &pending.history,
                        system_prompt.as_deref(),
                        collection.as_deref(),
                    )
                    .await;
                out.emit(AppCmd::ChatReplied(pending.ticket, result));
            })
        });
    }

    fn show_error(&mut self, message: &str, sender: &AsyncComponentSender<Self>) {
        self.error_generation += 1;
        self.banner.set_title(message);
        self.banner.set_revealed(true);

        let generation = self.error_generation;
        let input = sender.input_sender().clone();
        glib::timeout_add_local_once(config::ERROR_BANNER_TIMEOUT, move || {
            input.emit(AppMsg::ErrorTimeout(generation));
        });
    }

    fn hide_error(&self) {
        self.banner.set_revealed(false);
    }

    fn apply_branding(&self, root: &adw::ApplicationWindow) {
        let metadata = self.collection.metadata();
        root.set_title(Some(&self.collection.window_title()));
        self.window_title.set_title(&metadata.title);
        self.window_title
            .set_subtitle(self.collection.resolved().unwrap_or_default());
        self.chat_view
            .emit(ChatViewMsg::SetBranding(branding(&self.collection)));
    }

    fn load_collection(&self, sender: &AsyncComponentSender<Self>) {
        self.logo.set_visible(false);
        let api = self.api.clone();
        let requested = self.collection.requested().map(str::to_string);
        sender.command(move |out, _| {
            Box::pin(async move {
                let metadata = api.fetch_collection_metadata(requested.as_deref()).await;
                out.emit(AppCmd::MetadataLoaded(requested, metadata));
            })
        });
    }

    fn load_logo(&self, sender: &AsyncComponentSender<Self>) {
        let url = self.collection.metadata().logo.clone();
        if url.is_empty() {
            return;
        }
        let api = self.api.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let result = api.fetch_logo(&url).await;
                out.emit(AppCmd::LogoLoaded(url, result));
            })
        });
    }

    fn save_settings(&self, sender: &AsyncComponentSender<Self>) {
        let Some(db) = self.db.clone() else {
            return;
        };
        let settings = self.settings.clone();
        sender.command(move |_out, _| {
            Box::pin(async move {
                if let Err(e) = SettingsService::save(&db, &settings).await {
                    tracing::error!("Failed to save settings: {}", e);
                }
            })
        });
    }

    fn export_conversation(
        &self,
        conversation: &Conversation,
        format: ExportFormat,
        root: &adw::ApplicationWindow,
    ) {
        let contents = format.export(conversation, &self.collection.metadata().title);
        let filename = format!(
            "{}.{}",
            conversation.title.replace(['/', '\\'], "_"),
            format.extension()
        );

        let dialog = gtk::FileDialog::builder()
            .title(format!("Export as {}", format.label()))
            .initial_name(&filename)
            .build();

        let toast_overlay = self.toast_overlay.clone();
        dialog.save(Some(root), None::<&gio::Cancellable>, move |result| {
            // An error here means the user cancelled.
            let Ok(file) = result else {
                return;
            };
            let Some(path) = file.path() else {
                return;
            };

            let message = match std::fs::write(&path, &contents) {
                Ok(()) => {
                    tracing::info!("Exported conversation to {}", path.display());
                    "Conversation exported".to_string()
                }
                Err(e) => {
                    tracing::error!("Export to {} failed: {}", path.display(), e);
                    format!("Export failed: {}", e)
                }
            };
            let toast = adw::Toast::new(&message);
            toast.set_timeout(3);
            toast_overlay.add_toast(toast);
        });
    }
}

fn branding(collection: &CollectionState) -> Branding {
    Branding {
        title: collection.metadata().title.clone(),
        placeholder: collection.input_placeholder(),
        disclaimer: collection.disclaimer(),
    }
}

fn register_action(
    app: &adw::Application,
    input: &relm4::Sender<AppMsg>,
    name: &str,
    accels: &[&str],
    make_msg: fn() -> AppMsg,
) {
    let action = gio::SimpleAction::new(name, None);
    let input = input.clone();
    action.connect_activate(move |_, _| {
        input.emit(make_msg());
    });
    app.add_action(&action);
    if !accels.is_empty() {
        app.set_accels_for_action(&format!("app.{}", name), accels);
    }
}
