//! End-to-end tests of the analyzer over mock ports.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use portfolio_analyzer::domain::analyzer::{Analyzer, BuildRequest};
use portfolio_analyzer::domain::error::AnalyzerError;
use portfolio_analyzer::domain::optimizer::MeanVariance;
use portfolio_analyzer::domain::portfolio::{AllocationMethod, Portfolio, equal_weights};
use portfolio_analyzer::domain::price::AlignPolicy;

fn request(name: &str, list: &[&str], allocation: AllocationMethod) -> BuildRequest {
    BuildRequest {
        name: name.to_string(),
        tickers: tickers(list),
        allocation,
        weights: None,
        start: date(2022, 1, 1),
        end: date(2023, 12, 31),
    }
}

mod build_pipeline {
    use super::*;

    #[test]
    fn equal_weight_build() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();

        assert_eq!(p.tickers, tickers(&["AAA", "BBB", "CCC"]));
        assert_eq!(p.weights, equal_weights(3));
        assert_eq!(p.returns.len(), 300);
        assert_eq!(p.start, date(2022, 1, 4));
        assert_eq!(p.price_window().start, date(2022, 1, 1));
    }

    #[test]
    fn custom_weights_build() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let mut req = request("tilt", &["AAA", "BBB"], AllocationMethod::Custom);
        req.weights = Some(vec![0.7, 0.3]);
        let p = analyzer.build_portfolio(&req).unwrap();

        let a = p.asset_returns.get("AAA").unwrap().values()[10];
        let b = p.asset_returns.get("BBB").unwrap().values()[10];
        assert_abs_diff_eq!(p.returns.values()[10], 0.7 * a + 0.3 * b, epsilon = 1e-15);
    }

    #[test]
    fn custom_without_weights_fails() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let err = analyzer
            .build_portfolio(&request("tilt", &["AAA", "BBB"], AllocationMethod::Custom))
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidWeights { .. }));
    }

    #[test]
    fn weights_not_summing_to_one_fail() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let mut req = request("tilt", &["AAA", "BBB"], AllocationMethod::Custom);
        req.weights = Some(vec![0.7, 0.7]);
        assert!(matches!(
            analyzer.build_portfolio(&req),
            Err(AnalyzerError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn missing_ticker_is_named() {
        let market = three_asset_market().with_error("ZZZ", "delisted");
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let err = analyzer
            .build_portfolio(&request("core", &["AAA", "ZZZ"], AllocationMethod::Equal))
            .unwrap_err();
        match err {
            AnalyzerError::MissingTicker { tickers } => assert_eq!(tickers, vec!["ZZZ".to_string()]),
            other => panic!("expected MissingTicker, got {other}"),
        }
    }

    #[test]
    fn optimized_build_beats_equal_weights() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let config = test_config();
        let mut analyzer = Analyzer::new(&market, &store, config.clone());

        let p = analyzer
            .build_portfolio(&request("opt", &["AAA", "BBB", "CCC"], AllocationMethod::Optimized))
            .unwrap();
        assert_eq!(p.allocation, AllocationMethod::Optimized);
        assert_abs_diff_eq!(p.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(p.weights.iter().all(|w| (0.0..=1.0).contains(w)));

        let model = MeanVariance::from_returns(&p.asset_returns, config.trading_days, config.risk_free_rate).unwrap();
        let optimized = model.statistics(&p.weights).sharpe;
        let equal = model.statistics(&equal_weights(3)).sharpe;
        assert!(optimized >= equal - 1e-9);
    }

    #[test]
    fn repeated_build_hits_cache() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let req = request("core", &["AAA", "BBB"], AllocationMethod::Equal);
        analyzer.build_portfolio(&req).unwrap();
        analyzer.build_portfolio(&req).unwrap();

        assert_eq!(market.calls.get(), 1);
        assert_eq!(analyzer.cache().stats(), (1, 1));
        analyzer.cache().clear();
        analyzer.build_portfolio(&req).unwrap();
        assert_eq!(market.calls.get(), 2);
    }
}

mod alignment {
    use super::*;

    fn gappy_market() -> MockMarketData {
        let full = wavy_prices(40, 0.001, 0.01, 0.5);
        let gappy: Vec<_> = full
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, _)| i % 5 != 3)
            .map(|(_, p)| p)
            .collect();
        MockMarketData::new()
            .with_prices("FULL", full)
            .with_prices("GAPPY", gappy)
    }

    #[test]
    fn intersect_drops_missing_dates() {
        let market = gappy_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("mix", &["FULL", "GAPPY"], AllocationMethod::Equal))
            .unwrap();
        // 41 prices, 8 removed
        assert_eq!(p.returns.len(), 41 - 8 - 1);
    }

    #[test]
    fn forward_fill_keeps_every_date() {
        let market = gappy_market();
        let store = MemoryStore::default();
        let mut config = test_config();
        config.align = AlignPolicy::ForwardFill;
        let mut analyzer = Analyzer::new(&market, &store, config);

        let p = analyzer
            .build_portfolio(&request("mix", &["FULL", "GAPPY"], AllocationMethod::Equal))
            .unwrap();
        assert_eq!(p.returns.len(), 40);
        // a filled day has zero return for the gappy asset
        assert_eq!(p.asset_returns.get("GAPPY").unwrap().values()[2], 0.0);
    }
}

mod metrics_and_grades {
    use super::*;

    #[test]
    fn price_path_example() {
        let prices = vec![
            (date(2024, 1, 1), 100.0),
            (date(2024, 1, 2), 102.0),
            (date(2024, 1, 3), 101.0),
            (date(2024, 1, 4), 105.0),
            (date(2024, 1, 5), 107.0),
        ];
        let market = MockMarketData::new().with_prices("ONE", prices);
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let mut req = request("one", &["ONE"], AllocationMethod::Equal);
        req.start = date(2024, 1, 1);
        req.end = date(2024, 1, 5);
        let p = analyzer.build_portfolio(&req).unwrap();
        let report = analyzer.metrics(&p, None).unwrap();

        assert_eq!(report.observations, 4);
        assert_abs_diff_eq!(report.total_return, 0.07, epsilon = 1e-12);
        assert!(report.alpha.is_none());
    }

    #[test]
    fn anti_correlated_pair_lowers_volatility() {
        let swing: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let a: Vec<f64> = swing.iter().map(|s| 0.001 + s).collect();
        let b: Vec<f64> = swing.iter().map(|s| 0.001 - s).collect();
        let market = MockMarketData::new()
            .with_prices("UP", prices_from_returns(start_date(), 50.0, &a))
            .with_prices("DOWN", prices_from_returns(start_date(), 80.0, &b));
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let pair = analyzer
            .build_portfolio(&request("pair", &["UP", "DOWN"], AllocationMethod::Equal))
            .unwrap();
        let up = analyzer
            .build_portfolio(&request("up", &["UP"], AllocationMethod::Equal))
            .unwrap();
        let down = analyzer
            .build_portfolio(&request("down", &["DOWN"], AllocationMethod::Equal))
            .unwrap();

        let mut vol = |p: &Portfolio| analyzer.metrics(p, None).unwrap().annual_volatility;
        let (v_pair, v_up, v_down) = (vol(&pair), vol(&up), vol(&down));
        assert!(v_pair < v_up.min(v_down));
    }

    #[test]
    fn benchmark_against_itself_has_unit_beta() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("solo", &["AAA"], AllocationMethod::Equal))
            .unwrap();
        let report = analyzer.metrics(&p, Some("AAA")).unwrap();

        assert_abs_diff_eq!(report.beta.unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.alpha.unwrap(), 0.0, epsilon = 1e-12);
        let bench = analyzer.benchmark_returns("AAA", date(2022, 1, 1), date(2023, 12, 31)).unwrap();
        assert_eq!(bench.dates(), p.returns.dates());
    }

    #[test]
    fn missing_benchmark_fails() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("solo", &["AAA"], AllocationMethod::Equal))
            .unwrap();
        assert!(matches!(
            analyzer.metrics(&p, Some("NOPE")),
            Err(AnalyzerError::MissingTicker { .. })
        ));
    }

    #[test]
    fn report_card_covers_graded_metrics() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let card = analyzer.grades(&p, Some("BBB")).unwrap();

        let names: Vec<&str> = card.grades.iter().map(|g| g.metric).collect();
        assert!(names.contains(&"Sharpe Ratio"));
        assert!(names.contains(&"Beta"));
        assert!((0.0..=4.0).contains(&card.gpa));
    }
}

mod optimization {
    use super::*;

    #[test]
    fn reoptimize_returns_new_portfolio() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let (q, result) = analyzer.reoptimize(&p).unwrap();

        assert_eq!(p.allocation, AllocationMethod::Equal);
        assert_eq!(q.allocation, AllocationMethod::Optimized);
        assert_eq!(q.name, "core");
        assert_eq!(q.weights, result.weights);
        assert_eq!(q.returns.dates(), p.returns.dates());
    }

    #[test]
    fn starved_solver_falls_back() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut config = test_config();
        config.optimizer.max_iterations = 0;
        let mut analyzer = Analyzer::new(&market, &store, config);

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let (q, result) = analyzer.reoptimize(&p).unwrap();
        assert!(!result.converged);
        assert_abs_diff_eq!(q.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn single_asset_cannot_be_optimized() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("solo", &["AAA"], AllocationMethod::Equal))
            .unwrap();
        assert!(matches!(
            analyzer.reoptimize(&p),
            Err(AnalyzerError::Optimization { best_weights: None, .. })
        ));
    }

    #[test]
    fn seeded_frontier_is_reproducible() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let a = analyzer.frontier(&p).unwrap();
        let b = analyzer.frontier(&p).unwrap();

        assert_eq!(a.points.len(), 200);
        assert_eq!(a, b);
        let best = a.max_sharpe.as_ref().unwrap();
        let sampled = a.best_sampled_sharpe().unwrap();
        assert!(best.stats.sharpe >= sampled.stats.sharpe - 1e-3);
    }
}

mod holdings_risk_regimes {
    use super::*;

    #[test]
    fn every_holding_gets_signal_and_stance() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let holdings = analyzer.holdings(&p).unwrap();

        assert_eq!(holdings.len(), 3);
        // indicators share the build's price fetch
        assert_eq!(market.calls.get(), 1);
        for h in &holdings {
            let total: i32 = h.signal.votes.iter().map(|v| v.points).sum();
            assert_eq!(total, h.signal.score);
            assert!((0.0..=100.0).contains(&h.signal.confidence));
        }
    }

    #[test]
    fn risk_report_is_seeded() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB"], AllocationMethod::Equal))
            .unwrap();
        let sim = portfolio_analyzer::domain::risk::MonteCarloConfig {
            paths: 100,
            days: 20,
            seed: Some(3),
        };
        let a = analyzer.risk(&p, &sim).unwrap();
        let b = analyzer.risk(&p, &sim).unwrap();

        assert_eq!(a, b);
        assert!(a.forward.var_99 <= a.forward.var_95);
        assert_eq!(a.monte_carlo.terminal_values.len(), 100);
    }

    #[test]
    fn regimes_cover_history() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let report = analyzer.regimes(&p).unwrap();

        assert_eq!(report.points.len(), p.returns.len());
        let classified: usize = report.statistics.iter().map(|s| s.occurrences).sum();
        assert_eq!(classified, p.returns.len() - 59);
    }

    #[test]
    fn full_analysis() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB", "CCC"], AllocationMethod::Equal))
            .unwrap();
        let analysis = analyzer.analyze(&p, None).unwrap();

        assert!(analysis.frontier.is_some());
        assert_eq!(analysis.holdings.len(), 3);
        assert_eq!(analysis.metrics.observations, 300);
        assert!(!analysis.grades.grades.is_empty());
        assert!(serde_json::to_string(&analysis).is_ok());
    }

    #[test]
    fn single_asset_analysis_skips_frontier() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("solo", &["CCC"], AllocationMethod::Equal))
            .unwrap();
        let analysis = analyzer.analyze(&p, None).unwrap();
        assert!(analysis.frontier.is_none());
    }
}

mod store {
    use super::*;

    #[test]
    fn save_load_list_delete() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let mut analyzer = Analyzer::new(&market, &store, test_config());

        let p = analyzer
            .build_portfolio(&request("core", &["AAA", "BBB"], AllocationMethod::Equal))
            .unwrap();
        analyzer.save_portfolio(&p).unwrap();

        assert_eq!(analyzer.list_portfolios().unwrap(), vec!["core".to_string()]);
        assert_eq!(analyzer.load_portfolio("core").unwrap(), p);

        analyzer.delete_portfolio("core").unwrap();
        assert!(analyzer.list_portfolios().unwrap().is_empty());
    }

    #[test]
    fn unknown_portfolio_is_not_found() {
        let market = three_asset_market();
        let store = MemoryStore::default();
        let analyzer = Analyzer::new(&market, &store, test_config());

        assert!(matches!(
            analyzer.load_portfolio("ghost"),
            Err(AnalyzerError::PortfolioNotFound { name }) if name == "ghost"
        ));
        assert!(matches!(
            analyzer.delete_portfolio("ghost"),
            Err(AnalyzerError::PortfolioNotFound { .. })
        ));
    }
}
