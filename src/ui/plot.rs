use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_extras::{Size, StripBuilder};
use egui_plot::{Bar, BarChart, Line, MarkerShape, Plot, PlotPoint, PlotPoints, Points, Polygon, Text};

use crate::charts::bar::BarView;
use crate::charts::bubble::{self, BubbleView};
use crate::charts::choropleth::{self, ChoroplethView, ScaleLegend};
use crate::charts::line::LineView;
use crate::charts::{ChartBoard, ChartKind, HoverSink, ViewState};
use crate::color::cause_color;

const HIGHLIGHT: Color32 = Color32::from_rgb(0xe6, 0x39, 0x46);

// ---------------------------------------------------------------------------
// Layout (central panel)
// ---------------------------------------------------------------------------

/// Render the four charts in a 2×2 grid.
pub fn chart_grid(ui: &mut Ui, charts: &mut ChartBoard) {
    StripBuilder::new(ui)
        .sizes(Size::remainder(), 2)
        .vertical(|mut rows| {
            rows.strip(|builder| {
                builder.sizes(Size::remainder(), 2).horizontal(|mut cells| {
                    cells.cell(|ui| {
                        chart_cell(ui, ChartKind::Choropleth, |ui, h| choropleth(ui, &mut charts.choropleth, h));
                    });
                    cells.cell(|ui| {
                        chart_cell(ui, ChartKind::ScatterBubble, |ui, h| bubble_chart(ui, &mut charts.bubble, h));
                    });
                });
            });
            rows.strip(|builder| {
                builder.sizes(Size::remainder(), 2).horizontal(|mut cells| {
                    cells.cell(|ui| {
                        chart_cell(ui, ChartKind::Bar, |ui, h| bar_chart(ui, &charts.bar, h));
                    });
                    cells.cell(|ui| {
                        chart_cell(ui, ChartKind::Line, |ui, h| line_chart(ui, &mut charts.line, h));
                    });
                });
            });
        });
}

/// Title above, chart below. The chart gets the cell height minus room for
/// the title, legend and hover lines.
fn chart_cell(ui: &mut Ui, kind: ChartKind, body: impl FnOnce(&mut Ui, f32)) {
    ui.strong(kind.title());
    let height = (ui.available_height() - 56.0).max(80.0);
    body(ui, height);
}

/// Show the placeholder for a chart that cannot be drawn. Returns `true`
/// if it did.
fn placeholder<T>(ui: &mut Ui, state: &ViewState<T>, height: f32) -> bool {
    let Some(text) = state.placeholder() else {
        return false;
    };
    let color = match state {
        ViewState::Failed { .. } => Color32::RED,
        _ => ui.visuals().weak_text_color(),
    };
    let response = ui.allocate_ui(egui::vec2(ui.available_width(), height), |ui: &mut Ui| {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(RichText::new(text).color(color));
        });
    });
    if let ViewState::Failed { message, .. } = state {
        response.response.on_hover_text(message);
    }
    true
}

/// Forward the pointer to a chart's hover handler.
fn track_hover(view: &mut impl HoverSink, hovered: bool, pointer: Option<PlotPoint>) {
    match pointer {
        Some(p) if hovered => view.on_hover([p.x, p.y]),
        _ => view.on_leave(),
    }
}

fn hover_line(ui: &mut Ui, text: Option<String>) {
    // Reserve the line even when empty so the layout does not jump.
    ui.label(text.unwrap_or_else(|| " ".to_string()));
}

// ---------------------------------------------------------------------------
// Choropleth
// ---------------------------------------------------------------------------

fn choropleth(ui: &mut Ui, view: &mut ChoroplethView, height: f32) {
    if placeholder(ui, view.state(), height) {
        return;
    }
    let Some(data) = view.state().data() else {
        return;
    };
    let hovered_name = view.hovered().map(|c| c.name.clone());
    let legend = data.legend(32);

    let response = Plot::new("choropleth")
        .height(height)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            for country in &data.map().countries {
                let outline = if hovered_name.as_deref() == Some(country.name.as_str()) {
                    Stroke::new(2.0, Color32::BLACK)
                } else {
                    Stroke::new(0.5, Color32::WHITE)
                };
                let fill = data.fill_for(country);
                for polygon in &country.polygons {
                    let points = PlotPoints::from(polygon.exterior.clone());
                    plot_ui.polygon(Polygon::new(points).fill_color(fill).stroke(outline));
                }
            }
            plot_ui.pointer_coordinate()
        });

    track_hover(view, response.response.hovered(), response.inner);

    match (view.notice(), legend) {
        (Some(notice), _) => {
            ui.label(RichText::new(notice).color(ui.visuals().weak_text_color()));
        }
        (None, Some(legend)) => scale_legend(ui, &legend),
        (None, None) => {}
    }
    hover_line(ui, view.hover_label().map(|l| l.replace('\n', " – ")));
}

/// Gradient strip with the extent labels at both ends.
fn scale_legend(ui: &mut Ui, legend: &ScaleLegend) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(choropleth::LEGEND_TITLE);
        ui.label(&legend.min_label);
        let (rect, _) = ui.allocate_exact_size(egui::vec2(180.0, 12.0), egui::Sense::hover());
        let step = rect.width() / legend.stops.len() as f32;
        for (i, color) in legend.stops.iter().enumerate() {
            let min = rect.left_top() + egui::vec2(step * i as f32, 0.0);
            let cell = egui::Rect::from_min_size(min, egui::vec2(step, rect.height()));
            ui.painter().rect_filled(cell, 0.0, *color);
        }
        ui.label(&legend.max_label);
    });
}

// ---------------------------------------------------------------------------
// Bubble chart
// ---------------------------------------------------------------------------

fn bubble_chart(ui: &mut Ui, view: &mut BubbleView, height: f32) {
    if placeholder(ui, view.state(), height) {
        return;
    }
    let Some(data) = view.state().data() else {
        return;
    };
    let frame = view.current_frame();
    let hovered = view.hovered().map(|p| p.name.clone());

    let mut plot = Plot::new("bubble")
        .height(height)
        .x_axis_label("Health expenditure (% of GDP, log scale)")
        .y_axis_label("Life expectancy (years)")
        .x_axis_formatter(|mark, _| format!("{:.1}", 10f64.powf(mark.value)))
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false);
    if let Some(extent) = data.extent() {
        plot = plot
            .include_x(extent.x.0)
            .include_x(extent.x.1)
            .include_y(extent.y.0)
            .include_y(extent.y.1);
    }

    let response = plot.show(ui, |plot_ui| {
        if let Some(frame) = frame {
            // Largest bubbles first so small ones stay visible on top.
            let mut points: Vec<_> = frame.points.values().collect();
            points.sort_by(|a, b| b.population.total_cmp(&a.population));
            for p in points {
                let is_hovered = hovered.as_deref() == Some(p.name.as_str());
                let color = data.colors().color_for(p.region.as_deref());
                plot_ui.points(
                    Points::new(vec![bubble::plot_position(p)])
                        .shape(MarkerShape::Circle)
                        .radius(data.radius(p.population))
                        .filled(true)
                        .color(if is_hovered { HIGHLIGHT } else { color.gamma_multiply(0.8) }),
                );
            }
            if let Some(extent) = data.extent() {
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(extent.x.1, extent.y.0),
                        RichText::new(frame.year.to_string()).size(28.0).strong(),
                    )
                    .anchor(egui::Align2::RIGHT_BOTTOM),
                );
            }
        }
        plot_ui.pointer_coordinate()
    });

    track_hover(view, response.response.hovered(), response.inner);

    ui.horizontal_wrapped(|ui: &mut Ui| {
        if let Some(data) = view.state().data() {
            for (region, color) in data.colors().legend_entries() {
                ui.label(RichText::new("●").color(color));
                ui.label(region);
            }
        }
    });
    hover_line(ui, view.hovered().map(|p| bubble::describe(p).replace('\n', " · ")));
}

// ---------------------------------------------------------------------------
// Bar chart
// ---------------------------------------------------------------------------

fn bar_chart(ui: &mut Ui, view: &BarView, height: f32) {
    if placeholder(ui, view.state(), height) {
        return;
    }
    let Some(data) = view.state().data() else {
        return;
    };
    let entries = view.current();
    let max = data.max_value().max(1.0);

    Plot::new("bar")
        .height(height)
        .x_axis_label("Share of deaths (%)")
        .x_axis_formatter(|mark, _| format!("{}%", mark.value))
        .show_y(false)
        .y_axis_formatter(|_, _| String::new())
        .include_x(0.0)
        .include_x(max * 1.35)
        .include_y(-0.6)
        .include_y(entries.len().max(1) as f64 - 0.4)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            // Largest share on top.
            let top = entries.len() as f64 - 1.0;
            let bars: Vec<Bar> = entries
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    Bar::new(top - i as f64, e.value)
                        .name(&e.name)
                        .fill(cause_color(&e.name))
                        .width(0.8)
                })
                .collect();
            plot_ui.bar_chart(BarChart::new(bars).horizontal());

            for (i, e) in entries.iter().enumerate() {
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(e.value + max * 0.02, top - i as f64),
                        format!("{}: {:.1}%", e.name, e.value),
                    )
                    .anchor(egui::Align2::LEFT_CENTER),
                );
            }
            if let Some(year) = view.year() {
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(max * 1.3, -0.5),
                        RichText::new(year.to_string()).size(28.0).strong(),
                    )
                    .anchor(egui::Align2::RIGHT_BOTTOM),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Line chart
// ---------------------------------------------------------------------------

fn line_chart(ui: &mut Ui, view: &mut LineView, height: f32) {
    if placeholder(ui, view.state(), height) {
        return;
    }
    let Some(data) = view.state().data() else {
        return;
    };
    let muted = ui.visuals().weak_text_color().gamma_multiply(0.5);

    let response = Plot::new("line")
        .height(height)
        .x_axis_label("Year")
        .y_axis_label("Life expectancy (years)")
        .include_y(0.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let mut highlighted = None;
            for (country, points) in data.series() {
                if view.is_highlighted(country) {
                    highlighted = Some((country, points));
                    continue;
                }
                plot_ui.line(Line::new(PlotPoints::from(points.to_vec())).color(muted).width(1.0));
            }
            // Drawn last so it sits above the other countries.
            if let Some((country, points)) = highlighted {
                plot_ui.line(
                    Line::new(PlotPoints::from(points.to_vec()))
                        .name(country)
                        .color(HIGHLIGHT)
                        .width(2.5),
                );
            }
            if let Some(hit) = view.hovered() {
                plot_ui.points(
                    Points::new(vec![[f64::from(hit.year), hit.value]])
                        .radius(4.0)
                        .color(HIGHLIGHT),
                );
            }
            plot_ui.pointer_coordinate()
        });

    track_hover(view, response.response.hovered(), response.inner);
    hover_line(ui, view.hovered().map(|h| format!("{} ({})", h.label(), h.year)));
}
