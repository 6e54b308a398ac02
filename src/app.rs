use chrono::NaiveDate;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use tokio::runtime::Runtime;

use crate::analysis::forecast::MIN_OBSERVATIONS;
use crate::analysis::{forecast, resample, Interval};
use crate::config::DbConfig;
use crate::db;
use crate::models::{Product, SeriesPoint};

const HISTORY_COLOR: Color32 = Color32::from_rgb(66, 133, 244);
const FORECAST_COLOR: Color32 = Color32::from_rgb(255, 165, 0);
const WARN_COLOR: Color32 = Color32::from_rgb(235, 175, 60);

/// Single-window dashboard. All derived state below `selected`/`interval`
/// is recomputed from scratch by `refresh` on every relevant widget change;
/// nothing is cached across interactions.
pub struct DashboardApp {
    rt: Runtime,
    cfg: DbConfig,

    products: Vec<Product>,
    catalog_warning: Option<String>,

    selected: Option<i64>,
    interval: Interval,

    history: Vec<SeriesPoint>,
    forecast: Vec<SeriesPoint>,
    data_warning: Option<String>,
    forecast_warning: Option<String>,

    dirty: bool,
}

impl DashboardApp {
    pub fn new(rt: Runtime, cfg: DbConfig) -> Self {
        let mut app = Self {
            rt,
            cfg,
            products: Vec::new(),
            catalog_warning: None,
            selected: None,
            interval: Interval::Day,
            history: Vec::new(),
            forecast: Vec::new(),
            data_warning: None,
            forecast_warning: None,
            dirty: true,
        };
        app.load_catalog();
        app
    }

    fn load_catalog(&mut self) {
        match self.rt.block_on(db::fetch_products(&self.cfg)) {
            Ok(products) => {
                self.catalog_warning = if products.is_empty() {
                    Some(
                        "No se pudo obtener la lista de productos desde la base de datos."
                            .to_string(),
                    )
                } else {
                    None
                };
                if self
                    .selected
                    .map_or(true, |id| !products.iter().any(|p| p.id == id))
                {
                    self.selected = products.first().map(|p| p.id);
                }
                self.products = products;
            }
            Err(e) => {
                tracing::warn!("catalog load failed: {e:#}");
                self.products.clear();
                self.selected = None;
                self.catalog_warning =
                    Some(format!("Error al conectar con la base de datos: {e:#}"));
            }
        }
    }

    /// Runs the whole pipeline (fetch, aggregate, forecast) synchronously
    /// against the current selection, replacing all derived state. Each
    /// stage catches its own failure class and leaves a warning instead of
    /// propagating.
    fn refresh(&mut self) {
        self.history.clear();
        self.forecast.clear();
        self.data_warning = None;
        self.forecast_warning = None;

        let Some(product_id) = self.selected else {
            return;
        };
        tracing::info!(product_id, interval = self.interval.label(), "running pipeline");

        let records = match self.rt.block_on(db::fetch_sales(&self.cfg, Some(product_id))) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("sales fetch failed: {e:#}");
                self.data_warning = Some(format!("Error al conectar con la base de datos: {e:#}"));
                return;
            }
        };
        if records.is_empty() {
            self.data_warning =
                Some("No se encontraron datos para el producto seleccionado.".to_string());
            return;
        }

        let series = resample(&records, self.interval);
        if series.is_empty() {
            self.data_warning = Some(
                "No se pudo procesar los datos. Verifique que la tabla contiene información válida."
                    .to_string(),
            );
            return;
        }
        self.history = series;

        if self.history.len() < MIN_OBSERVATIONS {
            self.forecast_warning = Some(format!(
                "Se necesitan al menos {MIN_OBSERVATIONS} períodos para generar una predicción."
            ));
            return;
        }
        match forecast(&self.history, self.interval.horizon(), self.interval) {
            Ok(points) => self.forecast = points,
            Err(e) => {
                tracing::warn!("forecast failed: {e:#}");
                self.forecast_warning = Some(format!("Error al realizar la predicción: {e:#}"));
            }
        }
    }

    fn selected_name(&self) -> String {
        self.products
            .iter()
            .find(|p| Some(p.id) == self.selected)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn draw(&mut self, ui: &mut egui::Ui) {
        ui.heading("📊 Predicción de Ventas por Producto");
        ui.label("Seleccione un producto para analizar las ventas y generar predicciones.");
        ui.add_space(8.0);

        if self.products.is_empty() {
            let msg = self
                .catalog_warning
                .clone()
                .unwrap_or_else(|| "No hay productos disponibles.".to_string());
            warn_label(ui, &msg);
            if ui.button("Reintentar").clicked() {
                self.load_catalog();
                self.dirty = true;
            }
            return;
        }

        egui::ComboBox::from_label("Producto")
            .selected_text(self.selected_name())
            .show_ui(ui, |ui| {
                for product in &self.products {
                    if ui
                        .selectable_value(&mut self.selected, Some(product.id), &product.name)
                        .changed()
                    {
                        self.dirty = true;
                    }
                }
            });

        ui.horizontal(|ui| {
            ui.label("Intervalo de predicción:");
            for interval in [Interval::Day, Interval::Week, Interval::Month] {
                if ui
                    .radio_value(&mut self.interval, interval, interval.label())
                    .changed()
                {
                    self.dirty = true;
                }
            }
        });
        ui.separator();

        if let Some(msg) = &self.data_warning {
            warn_label(ui, msg);
            return;
        }
        if self.history.is_empty() {
            return;
        }

        let origin = self.history[0].period;

        ui.heading(format!("📈 Datos históricos de ventas ({})", self.selected_name()));
        Plot::new("historical")
            .height(240.0)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(chart_points(&self.history, origin))
                        .name("Histórico")
                        .color(HISTORY_COLOR)
                        .width(2.5),
                );
            });

        ui.add_space(6.0);
        ui.heading("📊 Tabla de Datos Históricos");
        series_table(ui, "hist_table", "Ventas", &self.history);

        if let Some(msg) = &self.forecast_warning {
            ui.add_space(6.0);
            warn_label(ui, msg);
            return;
        }
        if self.forecast.is_empty() {
            return;
        }

        ui.add_space(6.0);
        ui.heading(format!("🔮 Predicción de ventas ({})", self.selected_name()));
        Plot::new("forecast")
            .height(240.0)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(chart_points(&self.history, origin))
                        .name("Histórico")
                        .color(HISTORY_COLOR)
                        .width(2.0),
                );
                plot_ui.line(
                    Line::new(chart_points(&self.forecast, origin))
                        .name("Predicción")
                        .color(FORECAST_COLOR)
                        .width(2.0),
                );
            });

        ui.add_space(6.0);
        ui.heading("📊 Tabla de Predicciones");
        series_table(ui, "forecast_table", "Predicción", &self.forecast);
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.dirty {
            self.refresh();
            self.dirty = false;
        }
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw(ui);
            });
        });
    }
}

/// X axis is days since the first historical period, so history and
/// forecast share one scale on the overlay chart.
fn chart_points(series: &[SeriesPoint], origin: NaiveDate) -> PlotPoints {
    series
        .iter()
        .map(|p| [(p.period - origin).num_days() as f64, p.total])
        .collect()
}

fn warn_label(ui: &mut egui::Ui, msg: &str) {
    ui.colored_label(WARN_COLOR, format!("⚠ {msg}"));
}

fn series_table(ui: &mut egui::Ui, id: &str, value_header: &str, series: &[SeriesPoint]) {
    egui::ScrollArea::vertical()
        .id_source(id)
        .max_height(180.0)
        .show(ui, |ui| {
            egui::Grid::new(id)
                .striped(true)
                .num_columns(2)
                .min_col_width(120.0)
                .show(ui, |ui| {
                    ui.strong("Fecha");
                    ui.strong(value_header);
                    ui.end_row();
                    for point in series {
                        ui.label(point.period.format("%Y-%m-%d").to_string());
                        ui.label(format!("{:.2}", point.total));
                        ui.end_row();
                    }
                });
        });
}
