//! Dashboard presentation.
//!
//! Maps an [`AnalysisResult`] onto the fixed display slots of the dashboard
//! and renders its chart exactly once per presented analysis.

use super::chart_builder::{ChartSpecBuilder, ChartView};
use super::render::ChartRenderer;
use super::sanitizer::sanitize;
use crate::error::Result;
use crate::types::{AnalysisResult, ChartType, Signal};
use tracing::info;

/// Color class of a display slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Gain,
    Loss,
    Neutral,
    /// Between gain and loss, e.g. a middling accuracy.
    Caution,
}

const SIGNAL_TONES: [(Signal, Tone); 3] = [
    (Signal::Buy, Tone::Gain),
    (Signal::Sell, Tone::Loss),
    (Signal::Hold, Tone::Neutral),
];

impl Tone {
    pub fn for_signal(signal: Signal) -> Self {
        SIGNAL_TONES
            .iter()
            .find(|(s, _)| *s == signal)
            .map(|(_, tone)| *tone)
            .unwrap_or(Tone::Neutral)
    }

    pub fn for_variation(variation_pct: f64) -> Self {
        if variation_pct > 0.0 {
            Tone::Gain
        } else {
            Tone::Loss
        }
    }
}

/// Formatted dashboard slots.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardFields {
    pub title: String,
    pub signal: String,
    pub signal_tone: Tone,
    pub confidence: String,
    pub current_price: String,
    pub predicted_price: String,
    pub horizon: String,
    pub variation: String,
    pub variation_tone: Tone,
}

impl DashboardFields {
    pub fn from_result(result: &AnalysisResult, currency_prefix: &str) -> Self {
        let profile = result.profile.map(|p| p.label()).unwrap_or("Default");
        let arrow = if result.variation_pct > 0.0 { "▲" } else { "▼" };

        Self {
            title: format!("{} | Profile {}", result.ticker, profile),
            signal: result.signal.clone(),
            signal_tone: Tone::for_signal(result.signal_kind()),
            confidence: format_confidence(result.confidence),
            current_price: format!("{}{:.2}", currency_prefix, result.current_price),
            predicted_price: format!("{}{:.2}", currency_prefix, result.predicted_price),
            horizon: result.horizon.to_string(),
            variation: format!("{} {:.2}%", arrow, result.variation_pct.abs()),
            variation_tone: Tone::for_variation(result.variation_pct),
        }
    }
}

/// Confidence arrives as a fraction; values above 1 are already percentages.
fn format_confidence(confidence: f64) -> String {
    let percent = if confidence <= 1.0 {
        confidence * 100.0
    } else {
        confidence
    };
    format!("{:.1}%", percent)
}

/// Presents analyses and owns the live dashboard chart.
pub struct DashboardPresenter<R: ChartRenderer> {
    renderer: R,
    builder: ChartSpecBuilder,
    currency_prefix: String,
    view: Option<ChartView>,
    fields: Option<DashboardFields>,
}

impl<R: ChartRenderer> DashboardPresenter<R> {
    pub fn new(renderer: R, currency_prefix: impl Into<String>) -> Self {
        let currency_prefix = currency_prefix.into();
        Self {
            renderer,
            builder: ChartSpecBuilder::new(currency_prefix.clone()),
            currency_prefix,
            view: None,
            fields: None,
        }
    }

    /// Fill the dashboard slots and render the chart.
    pub fn present(&mut self, result: &AnalysisResult, chart_type: ChartType) -> Result<&DashboardFields> {
        if let Some(mut previous) = self.view.take() {
            previous.release(&mut self.renderer);
        }

        let fields = DashboardFields::from_result(result, &self.currency_prefix);
        let data = sanitize(&result.chart_data);
        let mut view = ChartView::new(data, result.ticker.clone(), chart_type, self.builder.clone());
        view.render(&mut self.renderer)?;

        info!(
            "Presented {} ({} candles, {} overlays)",
            result.ticker,
            view.data().candles.len(),
            view.data().renderable_indicators().count()
        );

        self.view = Some(view);
        Ok(&*self.fields.insert(fields))
    }

    /// Re-render the current analysis as another chart type.
    pub fn switch_chart_type(&mut self, chart_type: ChartType) -> Result<()> {
        match self.view.as_mut() {
            Some(view) => view.switch_type(chart_type, &mut self.renderer),
            None => Ok(()),
        }
    }

    /// Re-render the current chart unchanged.
    pub fn rerender(&mut self) -> Result<()> {
        match self.view.as_mut() {
            Some(view) => view.rerender(&mut self.renderer),
            None => Ok(()),
        }
    }

    /// Release the live chart, if any.
    pub fn clear(&mut self) {
        if let Some(mut view) = self.view.take() {
            view.release(&mut self.renderer);
        }
        self.fields = None;
    }

    pub fn fields(&self) -> Option<&DashboardFields> {
        self.fields.as_ref()
    }

    pub fn view(&self) -> Option<&ChartView> {
        self.view.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::render::RenderHandle;
    use crate::types::{ChartSpec, Horizon, HorizonUnit, RawChartData, RawPoint, RiskProfile};
    use serde_json::json;

    #[derive(Default)]
    struct RecordingRenderer {
        renders: usize,
        live: Vec<u64>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&mut self, _spec: ChartSpec) -> Result<RenderHandle> {
            self.renders += 1;
            self.live.push(self.renders as u64);
            Ok(RenderHandle::new(self.renders as u64))
        }

        fn release(&mut self, handle: RenderHandle) {
            self.live.retain(|id| *id != handle.id());
        }
    }

    fn result(signal: &str, variation_pct: f64, profile: Option<RiskProfile>) -> AnalysisResult {
        AnalysisResult {
            ticker: "PETR4".to_string(),
            signal: signal.to_string(),
            confidence: 0.82,
            current_price: 38.5,
            predicted_price: 41.2,
            variation_pct,
            horizon: Horizon {
                count: 30,
                unit: HorizonUnit::Days,
            },
            profile,
            chart_data: RawChartData {
                candles: vec![RawPoint {
                    x: json!(1),
                    y: json!([38.0, 38.9, 37.8, 38.5]),
                }],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_fields_for_buy_signal() {
        let fields = DashboardFields::from_result(&result("COMPRA 🚀", 7.01, Some(RiskProfile::Moderate)), "R$ ");

        assert_eq!(fields.title, "PETR4 | Profile Moderate");
        assert_eq!(fields.signal_tone, Tone::Gain);
        assert_eq!(fields.confidence, "82.0%");
        assert_eq!(fields.current_price, "R$ 38.50");
        assert_eq!(fields.predicted_price, "R$ 41.20");
        assert_eq!(fields.horizon, "30 days");
        assert_eq!(fields.variation, "▲ 7.01%");
        assert_eq!(fields.variation_tone, Tone::Gain);
    }

    #[test]
    fn test_fields_for_sell_and_hold() {
        let sell = DashboardFields::from_result(&result("VENDA", -3.5, None), "R$ ");
        assert_eq!(sell.signal_tone, Tone::Loss);
        assert_eq!(sell.variation, "▼ 3.50%");
        assert_eq!(sell.variation_tone, Tone::Loss);
        assert_eq!(sell.title, "PETR4 | Profile Default");

        let hold = DashboardFields::from_result(&result("NEUTRO", 0.0, None), "R$ ");
        assert_eq!(hold.signal_tone, Tone::Neutral);
        assert_eq!(hold.variation_tone, Tone::Loss);
    }

    #[test]
    fn test_confidence_already_in_percent() {
        assert_eq!(format_confidence(82.0), "82.0%");
        assert_eq!(format_confidence(1.0), "100.0%");
    }

    #[test]
    fn test_present_renders_once_and_releases_previous() {
        let mut presenter = DashboardPresenter::new(RecordingRenderer::default(), "R$ ");
        let analysis = result("COMPRA", 7.01, None);

        presenter.present(&analysis, ChartType::Candlestick).unwrap();
        assert_eq!(presenter.renderer().renders, 1);

        presenter.present(&analysis, ChartType::Candlestick).unwrap();
        assert_eq!(presenter.renderer().renders, 2);
        assert_eq!(presenter.renderer().live, vec![2]);

        presenter.clear();
        assert!(presenter.renderer().live.is_empty());
        assert!(presenter.fields().is_none());
    }

    #[test]
    fn test_switch_without_view_is_noop() {
        let mut presenter = DashboardPresenter::new(RecordingRenderer::default(), "R$ ");
        presenter.switch_chart_type(ChartType::AreaOfClose).unwrap();
        assert_eq!(presenter.renderer().renders, 0);
    }
}
