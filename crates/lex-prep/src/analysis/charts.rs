//! Chart specification builders.

use crate::profiler::{CategoricalSummary, NumericSummary};
use crate::types::{BoxPlotSummary, CategoryCount, ChartSpec, HistogramBin, PlotType};

fn title(plot_type: PlotType, column: &str) -> String {
    format!("{} Plot of {}", plot_type.title_name(), column)
}

/// Equal-width bins from min to max; the last bin includes max.
pub fn histogram(column: &str, summary: &NumericSummary, bins: usize) -> ChartSpec {
    ChartSpec::Histogram {
        title: title(PlotType::Histogram, column),
        x_label: column.to_string(),
        y_label: "Frequency".to_string(),
        bins: build_histogram(&summary.sorted, bins),
    }
}

/// Expects `values` sorted ascending.
fn build_histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (values.first(), values.last()) else {
        return Vec::new();
    };

    if max == min {
        return vec![HistogramBin {
            start: min - 0.5,
            end: min + 0.5,
            count: values.len(),
        }];
    }

    let bin_count = bins.max(1);
    let width = (max - min) / bin_count as f64;
    let mut counts = vec![0usize; bin_count];

    for value in values {
        let index = (((value - min) / width) as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: min + idx as f64 * width,
            end: if idx + 1 == bin_count {
                max
            } else {
                min + (idx as f64 + 1.0) * width
            },
            count,
        })
        .collect()
}

pub fn boxplot(column: &str, summary: &NumericSummary, multiplier: f64) -> ChartSpec {
    let five_numbers = match (
        summary.min,
        summary.q1,
        summary.median,
        summary.q3,
        summary.max,
        summary.fences(multiplier),
    ) {
        (Some(min), Some(q1), Some(median), Some(q3), Some(max), Some((lower, upper))) => {
            Some(BoxPlotSummary {
                min,
                q1,
                median,
                q3,
                max,
                lower_fence: lower,
                upper_fence: upper,
            })
        }
        _ => None,
    };

    ChartSpec::BoxPlot {
        title: title(PlotType::Boxplot, column),
        x_label: column.to_string(),
        summary: five_numbers,
        outliers: summary.outliers(multiplier),
    }
}

/// Most frequent categories first, at most `limit` of them.
pub fn count(column: &str, summary: &CategoricalSummary, limit: usize) -> ChartSpec {
    let total = summary.count.max(1) as f64;
    let categories = summary
        .frequencies
        .iter()
        .take(limit)
        .map(|(value, count)| CategoryCount {
            value: value.clone(),
            count: *count,
            percentage: (*count as f64 / total) * 100.0,
        })
        .collect();

    ChartSpec::Count {
        title: title(PlotType::Count, column),
        x_label: column.to_string(),
        y_label: "Count".to_string(),
        categories,
        total_categories: summary.distinct(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_histogram_edges_and_counts() {
        let summary = NumericSummary::from_values(&[0.0, 1.0, 2.0, 3.0, 10.0], 0);
        let ChartSpec::Histogram { bins, title, .. } = histogram("x", &summary, 5) else {
            panic!("expected histogram");
        };

        assert_eq!(title, "Histogram Plot of x");
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[0].end, 2.0);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[4].end, 10.0);
        // Max lands in the last bin
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
    }

    #[test]
    fn test_histogram_single_value() {
        let bins = build_histogram(&[3.0, 3.0], 10);
        assert_eq!(
            bins,
            vec![HistogramBin {
                start: 2.5,
                end: 3.5,
                count: 2
            }]
        );
    }

    #[test]
    fn test_histogram_empty() {
        assert!(build_histogram(&[], 10).is_empty());
    }

    #[test]
    fn test_boxplot_outliers() {
        let summary = NumericSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0], 0);
        let ChartSpec::BoxPlot {
            summary: Some(five),
            outliers,
            ..
        } = boxplot("v", &summary, 1.5)
        else {
            panic!("expected boxplot with summary");
        };

        assert_eq!(five.q1, 2.0);
        assert_eq!(five.median, 3.0);
        assert_eq!(five.q3, 4.0);
        assert_eq!(five.upper_fence, 7.0);
        assert_eq!(outliers, vec![100.0]);
    }

    #[test]
    fn test_boxplot_empty_has_no_summary() {
        let summary = NumericSummary::from_values(&[], 3);
        let ChartSpec::BoxPlot { summary, outliers, .. } = boxplot("v", &summary, 1.5) else {
            panic!("expected boxplot");
        };
        assert!(summary.is_none());
        assert!(outliers.is_empty());
    }

    #[test]
    fn test_count_limit_and_total() {
        let summary = CategoricalSummary {
            count: 6,
            missing: 0,
            frequencies: vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 1),
            ],
        };
        let ChartSpec::Count {
            categories,
            total_categories,
            ..
        } = count("letter", &summary, 2)
        else {
            panic!("expected count chart");
        };

        assert_eq!(total_categories, 3);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].value, "a");
        assert_eq!(categories[0].percentage, 50.0);
    }
}
