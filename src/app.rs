use std::time::Instant;

use anyhow::Result;
use eframe::egui;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::ui::{panels, plot};
use crate::worker::FetchWorker;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct HealthAtlasApp {
    pub state: AppState,
}

impl HealthAtlasApp {
    /// Start the fetch worker and the first refresh pass.
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self> {
        let ctx = cc.egui_ctx.clone();
        let worker = FetchWorker::spawn(move || ctx.request_repaint())?;
        let mut state = AppState::from_config(config, worker);
        log::info!("Using {}", state.source_description());
        state.refresh();
        Ok(Self { state })
    }
}

impl eframe::App for HealthAtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let size = ctx.screen_rect().size();
        self.state.observe_viewport([size.x, size.y], now);
        self.state.poll(now);

        // ---- Top panel: menu bar and year range ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: status line ----
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            panels::status_bar(ui, &self.state);
        });

        // ---- Central panel: the four charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::chart_grid(ui, &mut self.state.charts);
        });

        if let Some(due) = self.state.next_wakeup() {
            ctx.request_repaint_after(due.saturating_duration_since(Instant::now()));
        }
    }
}
