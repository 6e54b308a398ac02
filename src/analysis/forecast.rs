use anyhow::{bail, Result};

use crate::analysis::aggregate::Interval;
use crate::models::SeriesPoint;

/// Fitting below this many observations is unstable; the caller skips the
/// forecast stage instead of invoking it.
pub const MIN_OBSERVATIONS: usize = 5;

const EPS: f64 = 1e-12;

/// Fitted ARIMA(1,1,1): one AR lag and one MA lag on the once-differenced
/// series. The order is fixed, never tuned.
struct Arima {
    mu: f64,
    phi: f64,
    theta: f64,
    last_w: f64,
    last_e: f64,
}

/// Fits ARIMA(1,1,1) to a regular aggregated series and projects it forward
/// by `horizon` buckets. Point estimates only, no intervals.
///
/// Future periods continue the bucket cadence immediately after the last
/// observed period: fixed-length steps for day/week, true calendar
/// month-ends for month.
pub fn forecast(
    series: &[SeriesPoint],
    horizon: usize,
    interval: Interval,
) -> Result<Vec<SeriesPoint>> {
    if series.len() < MIN_OBSERVATIONS {
        bail!(
            "need at least {MIN_OBSERVATIONS} observed periods to fit, got {}",
            series.len()
        );
    }

    let values: Vec<f64> = series.iter().map(|p| p.total).collect();
    let model = fit(&values)?;

    let mut out = Vec::with_capacity(horizon);
    let mut level = values[values.len() - 1];
    let mut w = model.last_w;
    let mut e = model.last_e;
    let mut period = series[series.len() - 1].period;

    for _ in 0..horizon {
        let w_next = model.mu + model.phi * (w - model.mu) + model.theta * e;
        level += w_next;
        period = interval.next(period);
        out.push(SeriesPoint { period, total: level });
        // Future shocks are their expectation, zero.
        w = w_next;
        e = 0.0;
    }
    Ok(out)
}

/// Hannan-Rissanen estimation: difference once, proxy the innovations with a
/// short autoregression, then least-squares the ARMA(1,1) coefficients on
/// lagged value + lagged innovation.
fn fit(values: &[f64]) -> Result<Arima> {
    let w: Vec<f64> = values.windows(2).map(|p| p[1] - p[0]).collect();
    let n = w.len();
    let mu = w.iter().sum::<f64>() / n as f64;
    let z: Vec<f64> = w.iter().map(|v| v - mu).collect();

    let var = z.iter().map(|v| v * v).sum::<f64>() / n as f64;
    if var < EPS {
        if mu.abs() < EPS {
            bail!("series has no variance, model fit is undefined");
        }
        // Differencing removed all structure: the series is a straight
        // trend, which the model degenerates to as pure drift.
        return Ok(Arima {
            mu,
            phi: 0.0,
            theta: 0.0,
            last_w: w[n - 1],
            last_e: 0.0,
        });
    }

    // Stage 1: short AR fit whose residuals stand in for the unobserved
    // innovations. Order is capped so both regressions stay overdetermined.
    let m = (n / 2).min(4).min(n.saturating_sub(3)).max(1);
    let ar = fit_ar(&z, m)?;
    let mut e = vec![0.0; n];
    for t in m..n {
        let mut pred = 0.0;
        for (j, a) in ar.iter().enumerate() {
            pred += a * z[t - 1 - j];
        }
        e[t] = z[t] - pred;
    }

    // Stage 2: regress z_t on [z_{t-1}, e_{t-1}], a 2x2 normal system.
    let mut s11 = 0.0;
    let mut s12 = 0.0;
    let mut s22 = 0.0;
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for t in (m + 1)..n {
        let x1 = z[t - 1];
        let x2 = e[t - 1];
        s11 += x1 * x1;
        s12 += x1 * x2;
        s22 += x2 * x2;
        b1 += x1 * z[t];
        b2 += x2 * z[t];
    }
    let coeffs = solve_linear(vec![vec![s11, s12], vec![s12, s22]], vec![b1, b2]);
    let Some(coeffs) = coeffs else {
        bail!("singular series, coefficient estimation failed");
    };
    if !coeffs.iter().all(|c| c.is_finite()) {
        bail!("model fit diverged");
    }

    // Keep the forecast recursion inside the stationary region.
    let phi = coeffs[0].clamp(-0.98, 0.98);
    let theta = coeffs[1].clamp(-0.98, 0.98);

    Ok(Arima {
        mu,
        phi,
        theta,
        last_w: w[n - 1],
        last_e: e[n - 1],
    })
}

/// Least-squares AR(m) on a zero-mean series, via the normal equations.
fn fit_ar(z: &[f64], m: usize) -> Result<Vec<f64>> {
    let n = z.len();
    let mut a = vec![vec![0.0; m]; m];
    let mut b = vec![0.0; m];
    for t in m..n {
        for i in 0..m {
            b[i] += z[t] * z[t - 1 - i];
            for j in 0..m {
                a[i][j] += z[t - 1 - i] * z[t - 1 - j];
            }
        }
    }
    match solve_linear(a, b) {
        Some(coeffs) => Ok(coeffs),
        None => bail!("singular series, innovation proxy failed"),
    }
}

/// Gaussian elimination with partial pivoting. Returns `None` when the
/// system is singular.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < EPS {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn daily_series(start: &str, totals: &[f64]) -> Vec<SeriesPoint> {
        let mut period = date(start);
        totals
            .iter()
            .map(|&total| {
                let p = SeriesPoint { period, total };
                period = Interval::Day.next(period);
                p
            })
            .collect()
    }

    #[test]
    fn returns_exactly_horizon_rows() {
        let series = daily_series(
            "2024-03-01",
            &[10.0, 14.0, 9.0, 16.0, 11.0, 15.0, 8.0, 17.0, 12.0, 13.0],
        );
        let out = forecast(&series, 7, Interval::Day).unwrap();
        assert_eq!(out.len(), 7);
        assert!(out.iter().all(|p| p.total.is_finite()));
    }

    #[test]
    fn first_forecast_period_follows_the_last_observed() {
        let series = daily_series("2024-03-01", &[10.0, 14.0, 9.0, 16.0, 11.0, 15.0]);
        let out = forecast(&series, 3, Interval::Day).unwrap();
        assert_eq!(out[0].period, date("2024-03-07"));
        assert_eq!(out[1].period, date("2024-03-08"));
    }

    #[test]
    fn monthly_periods_follow_the_calendar() {
        let mut period = date("2023-09-30");
        let series: Vec<SeriesPoint> = [5.0, 9.0, 4.0, 11.0, 7.0]
            .iter()
            .map(|&total| {
                let p = SeriesPoint { period, total };
                period = Interval::Month.next(period);
                p
            })
            .collect();
        assert_eq!(series.last().unwrap().period, date("2024-01-31"));

        let out = forecast(&series, 4, Interval::Month).unwrap();
        let periods: Vec<NaiveDate> = out.iter().map(|p| p.period).collect();
        assert_eq!(
            periods,
            vec![
                date("2024-02-29"),
                date("2024-03-31"),
                date("2024-04-30"),
                date("2024-05-31"),
            ]
        );
    }

    #[test]
    fn weekly_periods_step_seven_days() {
        let mut period = date("2024-01-07");
        let series: Vec<SeriesPoint> = [5.0, 9.0, 4.0, 11.0, 7.0, 6.0]
            .iter()
            .map(|&total| {
                let p = SeriesPoint { period, total };
                period = Interval::Week.next(period);
                p
            })
            .collect();
        let out = forecast(&series, 4, Interval::Week).unwrap();
        assert_eq!(out[0].period, date("2024-02-18"));
        assert_eq!(out[3].period, date("2024-03-10"));
    }

    #[test]
    fn linear_trend_degenerates_to_drift() {
        let series = daily_series("2024-03-01", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let out = forecast(&series, 3, Interval::Day).unwrap();
        assert!((out[0].total - 7.0).abs() < 1e-9);
        assert!((out[2].total - 9.0).abs() < 1e-9);
    }

    #[test]
    fn constant_series_is_a_fit_error() {
        let series = daily_series("2024-03-01", &[5.0; 8]);
        assert!(forecast(&series, 4, Interval::Day).is_err());
    }

    #[test]
    fn short_series_is_rejected() {
        let series = daily_series("2024-03-01", &[1.0, 2.0]);
        assert!(forecast(&series, 4, Interval::Day).is_err());
    }
}
