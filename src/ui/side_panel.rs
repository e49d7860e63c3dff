use chrono_tz::Tz;
use gtk::prelude::*;
use gtk::{Align, Label, ListBox, Orientation, ScrolledWindow};
use tracing::{info, warn};

use eventmap::feed::{EventMessage, Zone};
use eventmap::{CountryKey, DateSelector, FeedOutcome, PanelSurface};

use super::selector::DateSelectorWidget;

/// Slide-in country panel: title, its own date selector and the zone list.
#[derive(Clone)]
pub struct SidePanel {
    revealer: gtk::Revealer,
    title: Label,
    status: Label,
    zones: ListBox,
    close_button: gtk::Button,
    selector: DateSelectorWidget,
    tz: Tz,
}

impl SidePanel {
    pub fn new() -> Self {
        let title = Label::builder()
            .halign(Align::Start)
            .hexpand(true)
            .ellipsize(gtk::pango::EllipsizeMode::End)
            .build();
        title.add_css_class("title-3");

        let close_button = gtk::Button::builder()
            .icon_name("window-close-symbolic")
            .tooltip_text("Close")
            .build();
        close_button.add_css_class("flat");

        let header = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .build();
        header.append(&title);
        header.append(&close_button);

        let selector = DateSelectorWidget::new("Panel date");
        selector.widget().set_halign(Align::Start);

        let status = Label::builder()
            .halign(Align::Start)
            .wrap(true)
            .visible(false)
            .build();
        status.add_css_class("dim-label");

        let zones = ListBox::builder()
            .selection_mode(gtk::SelectionMode::None)
            .build();
        zones.add_css_class("boxed-list");

        let scrolled = ScrolledWindow::builder()
            .hscrollbar_policy(gtk::PolicyType::Never)
            .vexpand(true)
            .child(&zones)
            .build();

        let content = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(12)
            .margin_top(12)
            .margin_bottom(12)
            .margin_start(12)
            .margin_end(12)
            .width_request(380)
            .build();
        content.add_css_class("side-panel");
        content.append(&header);
        content.append(selector.widget());
        content.append(&status);
        content.append(&scrolled);

        let revealer = gtk::Revealer::builder()
            .transition_type(gtk::RevealerTransitionType::SlideLeft)
            .halign(Align::End)
            .valign(Align::Fill)
            .reveal_child(false)
            .child(&content)
            .build();

        Self {
            revealer,
            title,
            status,
            zones,
            close_button,
            selector,
            tz: local_timezone(),
        }
    }

    pub fn widget(&self) -> &gtk::Revealer {
        &self.revealer
    }

    pub fn selector(&self) -> &DateSelectorWidget {
        &self.selector
    }

    pub fn connect_close<F: Fn() + 'static>(&self, on_close: F) {
        self.close_button.connect_clicked(move |_| on_close());
    }

    fn clear_zones(&self) {
        while let Some(child) = self.zones.first_child() {
            self.zones.remove(&child);
        }
    }

    fn show_status(&self, text: &str) {
        self.status.set_label(text);
        self.status.set_visible(true);
    }
}

impl PanelSurface for SidePanel {
    fn open(&self, country: &CountryKey) {
        self.title.set_label(country.as_str());
        self.revealer.set_reveal_child(true);
    }

    fn close(&self) {
        self.revealer.set_reveal_child(false);
    }

    fn show_loading(&self) {
        self.clear_zones();
        self.show_status("Loading events…");
    }

    fn render(&self, outcome: &FeedOutcome) {
        self.clear_zones();
        match outcome.status_text() {
            Some(text) => self.show_status(&text),
            None => self.status.set_visible(false),
        }

        if let FeedOutcome::Loaded(feed) = outcome {
            for zone in &feed.zones {
                self.zones.append(&zone_row(zone, &self.tz));
            }
        }
    }

    fn sync_dates(&self, options: &[DateSelector], selected: Option<&DateSelector>) {
        self.selector.set_options(options, selected);
    }
}

fn zone_row(zone: &Zone, tz: &Tz) -> gtk::Expander {
    let messages = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(6)
        .margin_start(12)
        .margin_bottom(6)
        .build();
    for message in &zone.messages {
        messages.append(&message_row(message, tz));
    }

    let expander = gtk::Expander::builder()
        .label(format!("{} ({})", zone.header(), zone.messages_count))
        .child(&messages)
        .build();
    expander.add_css_class("zone-header");
    expander
}

fn message_row(message: &EventMessage, tz: &Tz) -> gtk::Expander {
    let body = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(4)
        .margin_start(12)
        .build();
    body.add_css_class("event-message");

    let text = Label::builder()
        .label(message.body())
        .wrap(true)
        .wrap_mode(gtk::pango::WrapMode::WordChar)
        .xalign(0.0)
        .selectable(true)
        .build();
    text.add_css_class("event-text");
    body.append(&text);

    let meta = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(8)
        .build();
    meta.add_css_class("event-meta");

    let attribution = message.attribution();
    if !attribution.is_empty() {
        meta.append(&Label::new(Some(&attribution)));
    }
    if let Some(time) = message.display_time(tz) {
        meta.append(&Label::new(Some(&time)));
    }
    if let (Some(url), Some(label)) = (message.url.clone(), message.link_label()) {
        let link = gtk::Button::builder().label(label).build();
        link.add_css_class("flat");
        link.connect_clicked(move |_| {
            if let Err(e) = open::that(&url) {
                warn!("Failed to open {}: {}", url, e);
            }
        });
        meta.append(&link);
    }
    body.append(&meta);

    let title = Label::builder()
        .label(message.display_title())
        .wrap(true)
        .xalign(0.0)
        .build();

    gtk::Expander::builder()
        .label_widget(&title)
        .child(&body)
        .build()
}

fn local_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| {
            info!("Detected timezone: {}", name);
            name.parse().ok()
        })
        .unwrap_or_else(|| {
            warn!("Failed to detect timezone, using UTC");
            chrono_tz::UTC
        })
}
