use gtk::prelude::*;
use gtk::{glib, Label};
use libshumate::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use tracing::warn;

use eventmap::markers::{ClickHandler, MarkerPlacement};
use eventmap::{DateSelector, DeviceClass, MapSurface};

use super::selector::DateSelectorWidget;

const TILE_URL: &str = "https://a.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png";

/// libshumate map with one marker layer, plus the banner and the date
/// selector that belong to it.
#[derive(Clone)]
pub struct MapView {
    map: libshumate::SimpleMap,
    layer: Option<libshumate::MarkerLayer>,
    banner: libadwaita::Banner,
    selector: DateSelectorWidget,
    device: DeviceClass,
}

impl MapView {
    pub fn new(device: DeviceClass, banner: libadwaita::Banner, selector: DateSelectorWidget) -> Self {
        let map = libshumate::SimpleMap::new();

        // CartoDB Dark Matter tiles
        let map_source = libshumate::RasterRenderer::from_url(TILE_URL);
        map.set_map_source(Some(&map_source));

        let initial_zoom = match device {
            DeviceClass::Compact => 2.0,
            DeviceClass::Full => 3.0,
        };
        let layer = map.map().and_then(|map_view| {
            let viewport = map_view.viewport()?;
            let layer = libshumate::MarkerLayer::new(&viewport);
            map_view.add_layer(&layer);

            viewport.set_min_zoom_level(2);
            viewport.set_max_zoom_level(8);
            map_view.go_to_full(20.0, 0.0, initial_zoom);

            Some(layer)
        });
        if layer.is_none() {
            warn!("Map has no viewport; country markers will not be shown");
        }

        map.set_vexpand(true);
        map.set_hexpand(true);

        Self {
            map,
            layer,
            banner,
            selector,
            device,
        }
    }

    pub fn widget(&self) -> &libshumate::SimpleMap {
        &self.map
    }

    pub fn selector(&self) -> &DateSelectorWidget {
        &self.selector
    }
}

impl MapSurface for MapView {
    type Marker = Option<libshumate::Marker>;

    fn add_marker(&self, placement: &MarkerPlacement, on_click: ClickHandler) -> Self::Marker {
        let layer = self.layer.as_ref()?;

        let marker = libshumate::Marker::new();
        marker.set_child(Some(&marker_widget(placement, on_click, self.device)));
        marker.set_location(placement.position.lat, placement.position.lon);
        layer.add_marker(&marker);

        Some(marker)
    }

    fn remove_marker(&self, marker: Self::Marker) {
        if let (Some(layer), Some(marker)) = (self.layer.as_ref(), marker) {
            layer.remove_marker(&marker);
        }
    }

    fn show_alert(&self, message: Option<&str>) {
        match message {
            Some(text) => {
                self.banner.set_title(text);
                self.banner.set_revealed(true);
            }
            None => self.banner.set_revealed(false),
        }
    }

    fn sync_dates(&self, options: &[DateSelector], selected: Option<&DateSelector>) {
        self.selector.set_options(options, selected);
    }
}

/// Filled circle with the country flag on top. The widget is sized to the
/// enlarged click target, the dot is drawn at its center.
fn marker_widget(placement: &MarkerPlacement, on_click: ClickHandler, device: DeviceClass) -> gtk::Widget {
    let style = placement.style;
    let size = (style.hit_radius() * 2.0).ceil() as i32;
    let color = gdk::RGBA::parse(style.color()).unwrap_or(gdk::RGBA::WHITE);
    let hovered = Rc::new(Cell::new(false));

    let area = gtk::DrawingArea::builder()
        .content_width(size)
        .content_height(size)
        .build();
    area.add_css_class("country-marker");

    let hovered_for_draw = hovered.clone();
    area.set_draw_func(move |_, cr, width, height| {
        let radius = if hovered_for_draw.get() {
            style.hover_radius()
        } else {
            style.radius
        };
        let (r, g, b) = (color.red() as f64, color.green() as f64, color.blue() as f64);

        cr.arc(
            width as f64 / 2.0,
            height as f64 / 2.0,
            radius,
            0.0,
            std::f64::consts::TAU,
        );
        cr.set_source_rgba(r, g, b, style.fill_opacity);
        if let Err(e) = cr.fill_preserve() {
            warn!("Failed to fill marker: {}", e);
        }
        cr.set_source_rgba(r, g, b, 1.0);
        cr.set_line_width(style.weight);
        if let Err(e) = cr.stroke() {
            warn!("Failed to stroke marker: {}", e);
        }
    });

    let motion = gtk::EventControllerMotion::new();
    let area_weak = area.downgrade();
    let hovered_on_enter = hovered.clone();
    motion.connect_enter(move |_, _, _| {
        hovered_on_enter.set(true);
        if let Some(area) = area_weak.upgrade() {
            area.queue_draw();
        }
    });
    let area_weak = area.downgrade();
    motion.connect_leave(move |_| {
        hovered.set(false);
        if let Some(area) = area_weak.upgrade() {
            area.queue_draw();
        }
    });
    area.add_controller(motion);

    let click = gtk::GestureClick::new();
    click.connect_released(move |_, _, _, _| on_click());
    area.add_controller(click);

    let overlay = gtk::Overlay::new();
    overlay.set_child(Some(&area));

    if let Some(flag) = placement.key.flag() {
        let flag_label = Label::new(None);
        flag_label.set_markup(&format!(
            "<span size=\"{}\">{}</span>",
            (style.radius * 1.2 * 1024.0) as i32,
            glib::markup_escape_text(flag)
        ));
        flag_label.set_can_target(false);
        overlay.add_overlay(&flag_label);
    }

    // Compact displays have no hover, so no tooltip there.
    if device == DeviceClass::Full {
        overlay.set_tooltip_text(Some(&format!(
            "{} · {} events",
            placement.key.display_name(),
            placement.events_count
        )));
    }

    overlay.upcast()
}
