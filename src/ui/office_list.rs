use egui::{Color32, RichText, Ui};

use crate::offices::filter::OfficeFilter;
use crate::session::{AppEvent, LoadState, Session};
use crate::viewport::controller::ViewState;

/// Filters, search and the office cards. Returns the user's actions.
pub fn show(ui: &mut Ui, session: &Session, address_query: &mut String) -> Vec<AppEvent> {
    let mut events = Vec::new();

    ui.heading(format!("Office Locations ({})", session.filtered().len()));
    ui.add_space(4.0);

    match session.load_state() {
        LoadState::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading offices...");
            });
            return events;
        }
        LoadState::Failed => {
            ui.colored_label(Color32::from_rgb(200, 40, 40), "⚠ Failed to load office data");
            if ui.button("Try Again").clicked() {
                events.push(AppEvent::RetryLoad);
            }
            return events;
        }
        LoadState::Loaded => {}
    }

    if let Some(filter) = filters(ui, session) {
        events.push(AppEvent::FilterChanged(filter));
    }

    ui.add_space(6.0);
    let idle = !session.lookup_pending();
    if ui
        .add_enabled(idle, egui::Button::new("Party Offices Near Me"))
        .on_hover_text("Show nearest offices to my location")
        .clicked()
    {
        events.push(AppEvent::NearMeRequested);
    }

    ui.horizontal(|ui| {
        let edit = ui.add(egui::TextEdit::singleline(address_query).hint_text("Search an address"));
        let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (ui.add_enabled(idle, egui::Button::new("Search")).clicked() || submitted) && idle {
            events.push(AppEvent::AddressSearchRequested(address_query.clone()));
        }
        if !idle {
            ui.spinner();
        }
    });

    let nearest = session.viewport().nearest_offices();
    if !nearest.is_empty() {
        ui.add_space(6.0);
        ui.label(RichText::new("Nearest offices").strong());
        for ranked in &nearest {
            if ui
                .link(format!("{} ({:.1} km)", ranked.office.name, ranked.distance_km))
                .clicked()
            {
                events.push(AppEvent::OfficeClicked(ranked.office.id.clone()));
            }
        }
    }

    if session.viewport().state() == ViewState::Focused && ui.button("Show all offices").clicked() {
        events.push(AppEvent::BackToOverview);
    }

    ui.separator();

    if session.filtered().is_empty() {
        ui.label("No office data available.");
        ui.label("Configure the NocoDB connection in the .env file or check your database.");
        return events;
    }

    let selected = session.viewport().selected();
    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        for office in session.filtered() {
            let is_selected = selected == Some(&office.id);
            let fill = if is_selected {
                ui.visuals().selection.bg_fill
            } else {
                ui.visuals().faint_bg_color
            };

            let card = egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    if let Some(party) = &office.party {
                        ui.label(RichText::new(party).strong());
                    }
                    ui.label(
                        RichText::new(office.province.as_deref().unwrap_or("Unknown Province")).weak(),
                    );
                });
                ui.label(RichText::new(&office.name).size(16.0));
                if let Some(mp) = &office.representative {
                    ui.horizontal(|ui| {
                        ui.label("MP:");
                        match &mp.link {
                            Some(link) => {
                                ui.hyperlink_to(&mp.name, link);
                            }
                            None => {
                                ui.label(&mp.name);
                            }
                        }
                    });
                }
            });

            if card.response.interact(egui::Sense::click()).clicked() {
                events.push(AppEvent::OfficeClicked(office.id.clone()));
            }
            ui.add_space(4.0);
        }
    });

    events
}

/// The edited filter, when the user changed it.
fn filters(ui: &mut Ui, session: &Session) -> Option<OfficeFilter> {
    let total = session.offices().len();
    let facets = session.facets();
    let mut filter = session.filter().clone();

    ui.label("Filter by Party:");
    let all_parties = format!("All Parties ({total})");
    egui::ComboBox::from_id_salt("party-select")
        .selected_text(filter.party.clone().unwrap_or_else(|| all_parties.clone()))
        .width(ui.available_width())
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut filter.party, None, all_parties.as_str());
            for (party, count) in &facets.parties {
                ui.selectable_value(&mut filter.party, Some(party.clone()), format!("{party} ({count})"));
            }
        });

    ui.label("Filter by Province:");
    let all_provinces = format!("All Provinces ({total})");
    egui::ComboBox::from_id_salt("province-select")
        .selected_text(filter.province.clone().unwrap_or_else(|| all_provinces.clone()))
        .width(ui.available_width())
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut filter.province, None, all_provinces.as_str());
            for (province, count) in &facets.provinces {
                ui.selectable_value(
                    &mut filter.province,
                    Some(province.clone()),
                    format!("{province} ({count})"),
                );
            }
        });

    (filter != *session.filter()).then_some(filter)
}
