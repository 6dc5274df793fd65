use adw::prelude::*;

use docs_chat::config;

pub fn create_shortcuts_window(parent: &adw::ApplicationWindow) {
    let window = gtk::ShortcutsWindow::builder()
        .transient_for(parent)
        .modal(true)
        .build();

    let general_group = gtk::ShortcutsGroup::builder().title("General").build();
    for (title, accelerator) in [
        ("New chat", "<Control>n"),
        ("Open collection", "<Control>o"),
        ("System prompt", "<Control>comma"),
        ("Toggle sidebar", "F9"),
        ("Keyboard shortcuts", "<Control>question"),
        ("Quit", "<Control>q"),
    ] {
        let shortcut = gtk::ShortcutsShortcut::builder()
            .title(title)
            .accelerator(accelerator)
            .build();
        general_group.add_shortcut(&shortcut);
    }

    let chat_group = gtk::ShortcutsGroup::builder().title("Chat").build();
    for (title, accelerator) in [
        ("Send message", "Return"),
        ("New line", "<Shift>Return"),
        ("Clear chat", "<Control>l"),
    ] {
        let shortcut = gtk::ShortcutsShortcut::builder()
            .title(title)
            .accelerator(accelerator)
            .build();
        chat_group.add_shortcut(&shortcut);
    }

    let section = gtk::ShortcutsSection::builder()
        .title(config::APP_NAME)
        .build();
    section.add_group(&general_group);
    section.add_group(&chat_group);

    window.add_section(&section);
    window.present();
}

pub fn create_about_dialog(parent: &adw::ApplicationWindow) {
    let about = adw::AboutDialog::builder()
        .application_name(config::APP_NAME)
        .version(config::VERSION)
        .developer_name("Docs Chat Contributors")
        .license_type(gtk::License::Gpl30)
        .comments("Ask questions about product documentation and get answers with sources")
        .application_icon(config::APP_ID)
        .build();
    about.present(Some(parent));
}

/// Asks for a collection slug or a URL ending in `#slug`.
pub fn create_collection_dialog(
    parent: &adw::ApplicationWindow,
    current: Option<&str>,
    on_open: impl Fn(Option<String>) + 'static,
) {
    let entry = gtk::Entry::builder()
        .placeholder_text("geology or https://docs.example.com/#geology")
        .text(current.unwrap_or_default())
        .activates_default(true)
        .build();

    let dialog = adw::AlertDialog::builder()
        .heading("Open Collection")
        .body("Enter a collection name, or a documentation link that ends with one. Leave empty for all documentation.")
        .close_response("cancel")
        .default_response("open")
        .extra_child(&entry)
        .build();
    dialog.add_responses(&[("cancel", "Cancel"), ("open", "Open")]);
    dialog.set_response_appearance("open", adw::ResponseAppearance::Suggested);

    dialog.connect_response(None, move |_, response| {
        if response == "open" {
            on_open(config::collection_from_location(&entry.text()));
        }
    });

    dialog.present(Some(parent));
}

pub fn show_error_dialog(parent: &adw::ApplicationWindow, heading: &str, body: &str) {
    let dialog = adw::AlertDialog::builder()
        .heading(heading)
        .body(body)
        .close_response("ok")
        .default_response("ok")
        .build();
    dialog.add_response("ok", "OK");
    dialog.present(Some(parent));
}
