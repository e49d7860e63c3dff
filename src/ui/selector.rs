use gtk::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use eventmap::DateSelector;

/// Drop-down over the timeline options. Programmatic updates do not fire the
/// change callback.
#[derive(Clone)]
pub struct DateSelectorWidget {
    dropdown: gtk::DropDown,
    model: gtk::StringList,
    options: Rc<RefCell<Vec<DateSelector>>>,
    updating: Rc<Cell<bool>>,
}

impl DateSelectorWidget {
    pub fn new(tooltip: &str) -> Self {
        let model = gtk::StringList::new(&[]);
        let dropdown = gtk::DropDown::builder()
            .model(&model)
            .tooltip_text(tooltip)
            .sensitive(false)
            .build();
        dropdown.add_css_class("date-selector");

        Self {
            dropdown,
            model,
            options: Rc::new(RefCell::new(Vec::new())),
            updating: Rc::new(Cell::new(false)),
        }
    }

    pub fn widget(&self) -> &gtk::DropDown {
        &self.dropdown
    }

    pub fn set_options(&self, options: &[DateSelector], selected: Option<&DateSelector>) {
        let labels: Vec<&str> = options.iter().map(option_label).collect();
        let position = selected
            .and_then(|s| options.iter().position(|o| o == s))
            .unwrap_or(0);

        self.updating.set(true);
        *self.options.borrow_mut() = options.to_vec();
        self.model.splice(0, self.model.n_items(), &labels);
        self.dropdown.set_selected(position as u32);
        self.dropdown.set_sensitive(selected.is_some());
        self.updating.set(false);
    }

    pub fn connect_changed<F: Fn(DateSelector) + 'static>(&self, on_change: F) {
        let options = self.options.clone();
        let updating = self.updating.clone();
        self.dropdown.connect_selected_notify(move |dropdown| {
            if updating.get() {
                return;
            }
            // INVALID_LIST_POSITION falls outside the options too.
            let date = options.borrow().get(dropdown.selected() as usize).cloned();
            if let Some(date) = date {
                on_change(date);
            }
        });
    }
}

fn option_label(option: &DateSelector) -> &str {
    match option {
        DateSelector::All => "All dates",
        DateSelector::Day(day) => day,
    }
}
