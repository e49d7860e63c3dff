mod map_view;
mod selector;
mod side_panel;

use gtk::prelude::*;
use gtk::{glib, Application, Label, Orientation};
use libadwaita::{prelude::*, ApplicationWindow, ColorScheme, HeaderBar, StyleManager, ToolbarView};
use std::rc::Rc;
use tracing::{error, info};

use eventmap::{CountryKey, Dashboard, Settings, SiteSource};

use map_view::MapView;
use selector::DateSelectorWidget;
use side_panel::SidePanel;

type DesktopDashboard = Dashboard<SiteSource, MapView, SidePanel>;

pub fn build_ui(app: &Application, settings: &Settings) {
    // Enable dark theme support
    let style_manager = StyleManager::default();
    style_manager.set_color_scheme(ColorScheme::PreferDark);

    let device = settings.device_class();

    let refresh_button = gtk::Button::builder()
        .icon_name("view-refresh-symbolic")
        .tooltip_text("Reload active countries")
        .build();
    let title = Label::new(Some("Eventmap"));
    title.add_css_class("title");
    let global_selector = DateSelectorWidget::new("Map date");

    let header_bar = HeaderBar::new();
    header_bar.pack_start(&refresh_button);
    header_bar.set_title_widget(Some(&title));
    header_bar.pack_end(global_selector.widget());

    let banner = libadwaita::Banner::builder().revealed(false).build();
    banner.set_use_markup(false);

    let map_view = MapView::new(device, banner.clone(), global_selector);
    let side_panel = SidePanel::new();

    // Panel floats over the right edge of the map
    let overlay = gtk::Overlay::new();
    overlay.set_child(Some(map_view.widget()));
    overlay.add_overlay(side_panel.widget());
    overlay.set_vexpand(true);

    let content = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .build();
    content.append(&banner);
    content.append(&overlay);

    let toolbar_view = ToolbarView::builder().build();
    toolbar_view.add_top_bar(&header_bar);
    toolbar_view.set_content(Some(&content));

    let window = ApplicationWindow::builder()
        .application(app)
        .title("Eventmap")
        .default_width(1100)
        .default_height(720)
        .build();

    let css_provider = gtk::CssProvider::new();
    css_provider.load_from_data(
        ".side-panel {
            background-color: alpha(@window_bg_color, 0.92);
            border-radius: 12px;
            padding: 12px;
            box-shadow: 0 4px 16px alpha(black, 0.5);
        }
        .zone-header > title {
            font-weight: 600;
        }
        .event-message {
            background-color: alpha(@card_bg_color, 0.5);
            border-radius: 8px;
            padding: 6px 8px;
            border: 1px solid alpha(@borders, 0.5);
        }
        .event-text {
            line-height: 1.4;
        }
        .event-meta {
            font-size: 11px;
            color: alpha(@window_fg_color, 0.55);
        }
        .date-selector {
            min-width: 140px;
        }",
    );

    gtk::style_context_add_provider_for_display(
        &gtk::prelude::WidgetExt::display(&window),
        &css_provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    window.set_content(Some(&toolbar_view));
    window.present();

    let source = SiteSource::from_location(&settings.source);
    info!("Reading dashboard data from {}", settings.source);

    glib::spawn_future_local(async move {
        match Dashboard::open(source, map_view, side_panel, device).await {
            Ok(dashboard) => {
                // Handlers go in before the selectors turn sensitive.
                let dashboard = Rc::new(dashboard);
                connect_dashboard(dashboard.clone(), &refresh_button);
                dashboard.load_timeline().await;
            }
            Err(e) => {
                error!("Failed to load country catalog: {}", e);
                banner.set_title(&format!("⚠️ Could not load the country catalog: {e}"));
                banner.set_revealed(true);
            }
        }
    });
}

/// Hooks the widgets up to a loaded dashboard. Widgets the dashboard owns only
/// hold weak references back to it; the header bar keeps it alive.
fn connect_dashboard(dashboard: Rc<DesktopDashboard>, refresh_button: &gtk::Button) {
    let weak = Rc::downgrade(&dashboard);
    dashboard.set_select_handler(Rc::new(move |country: CountryKey| {
        if let Some(dashboard) = weak.upgrade() {
            glib::spawn_future_local(async move {
                dashboard.open_country(country).await;
            });
        }
    }));

    let weak = Rc::downgrade(&dashboard);
    dashboard.markers().surface().selector().connect_changed(move |date| {
        if let Some(dashboard) = weak.upgrade() {
            glib::spawn_future_local(async move {
                dashboard.select_global_date(date).await;
            });
        }
    });

    let weak = Rc::downgrade(&dashboard);
    dashboard.panel().selector().connect_changed(move |date| {
        if let Some(dashboard) = weak.upgrade() {
            glib::spawn_future_local(async move {
                dashboard.select_panel_date(date).await;
            });
        }
    });

    let weak = Rc::downgrade(&dashboard);
    dashboard.panel().connect_close(move || {
        if let Some(dashboard) = weak.upgrade() {
            dashboard.close_panel();
        }
    });

    refresh_button.connect_clicked(move |_| {
        let dashboard = dashboard.clone();
        glib::spawn_future_local(async move {
            dashboard.refresh_markers().await;
        });
    });
}
