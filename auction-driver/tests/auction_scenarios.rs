//! End-to-end auction scenarios, exercised against the real
//! `InProcessSandbox` engine and `Registry` repository rather than fakes,
//! since the driver's contract is defined entirely in terms of how it
//! reacts to real compile/invoke outcomes.

use std::sync::Arc;

use auction_core::{
    models::{
        Ad, AuctionConfiguration, CompiledScript, FunctionRole, InterestGroup, Presence, Snapshot,
    },
    ports::{EngineOptions, Repository as _, ScriptEngine as _},
};
use auction_driver::AuctionDriver;
use auction_registry::Registry;
use auction_script_engine::InProcessSandbox;
use rustc_hash::FxHashMap;
use serde_json::json;

fn group(owner: &str, name: &str, bidder_uri: &str, render_url: &str) -> InterestGroup {
    InterestGroup {
        owner: owner.into(),
        name: name.into(),
        bidding_logic_url: bidder_uri.into(),
        ads: vec![Ad {
            metadata: json!({}),
            render_url: render_url.into(),
        }],
        user_bidding_signals: json!(null),
        trusted_bidding_signals: json!(null),
        browser_signals: json!(null),
    }
}

fn compile(engine: &InProcessSandbox, uri: &str, role: FunctionRole, source: &str) -> CompiledScript {
    engine
        .compile(uri, role, source, &EngineOptions::default())
        .unwrap_or_else(|e| panic!("{uri} should compile: {e}"))
}

fn registry_with(bidders: Vec<(&str, Presence)>, scorers: Vec<(&str, Presence)>) -> Registry {
    let mut bidder_map = FxHashMap::default();
    for (uri, presence) in bidders {
        bidder_map.insert(uri.to_string(), presence);
    }
    let mut scorer_map = FxHashMap::default();
    for (uri, presence) in scorers {
        scorer_map.insert(uri.to_string(), presence);
    }
    Registry::with_snapshot(Snapshot::new(bidder_map, scorer_map))
}

fn funny_wins_config() -> AuctionConfiguration {
    AuctionConfiguration {
        seller: "adnetwork.example".into(),
        decision_logic_url: "local://preferFunnyAds".into(),
        interest_group_buyers: vec!["adnetwork.example".into(), "dsp.example".into()],
        auction_signals: json!(null),
        seller_signals: json!(null),
        per_buyer_signals: {
            let mut map = FxHashMap::default();
            map.insert("adnetwork.example".into(), json!({ "foo": 21 }));
            map.insert(
                "dsp.example".into(),
                json!({ "foo": 20, "engagement": 3.5 }),
            );
            map
        },
    }
}

/// The scorer prefers a funny ad over a higher-valued but unfunny one.
#[test]
fn funny_wins_auction() {
    let engine = Arc::new(InProcessSandbox::new());

    let funnytoons_bidder = compile(
        &engine,
        "local://funnytoonsBidder",
        FunctionRole::Bidder,
        "input => ({ ad: { funny: true }, bid: input.perBuyerSignals.foo * 2, renderUrl: 'https://ads.example/funnytoons' })",
    );
    let ufo_bidder = compile(
        &engine,
        "local://ufoBidder",
        FunctionRole::Bidder,
        "input => ({ ad: { funny: false }, bid: input.perBuyerSignals.foo * input.perBuyerSignals.engagement, renderUrl: 'https://ads.example/ufo' })",
    );
    let scorer = compile(
        &engine,
        "local://preferFunnyAds",
        FunctionRole::Scorer,
        "input => ({ desirabilityScore: input.adMetadata.funny ? input.bid * 2 : input.bid })",
    );

    let repository = Arc::new(registry_with(
        vec![
            ("local://funnytoonsBidder", Presence::Present(funnytoons_bidder)),
            ("local://ufoBidder", Presence::Present(ufo_bidder)),
        ],
        vec![("local://preferFunnyAds", Presence::Present(scorer))],
    ));

    let driver = AuctionDriver::new(repository, engine, EngineOptions::default());

    let groups = vec![
        group(
            "adnetwork.example",
            "funnytoons",
            "local://funnytoonsBidder",
            "https://ads.example/funnytoons",
        ),
        group(
            "dsp.example",
            "ufoconspiracies",
            "local://ufoBidder",
            "https://ads.example/ufo",
        ),
    ];

    let response = driver
        .run_ad_auction(&groups, &funny_wins_config(), &FxHashMap::default())
        .expect("auction should succeed");

    let winner = response.winning_bid.expect("funnytoons should win");
    assert_eq!(winner.name, "funnytoons");
    assert_eq!(winner.bid_price, 42.0);
    assert_eq!(winner.desirability_score, 84.0);

    assert_eq!(response.losing_bids.len(), 1);
    assert_eq!(response.losing_bids[0].name, "ufoconspiracies");
    assert_eq!(response.losing_bids[0].bid_price, 70.0);
    assert_eq!(response.losing_bids[0].desirability_score, 70.0);
}

/// The driver half of a refresh swap: a `run_now`-style rebuild (simulated
/// here with a direct `publish` call, the same operation the Periodic
/// Refresher performs) changes the next request's outcome without touching
/// the request already in flight. The refresher's own scheduling loop is
/// tested in `auctiond`.
#[test]
fn publishing_a_new_snapshot_changes_the_next_requests_winner() {
    let engine = Arc::new(InProcessSandbox::new());

    let funnytoons_bidder = compile(
        &engine,
        "local://funnytoonsBidder",
        FunctionRole::Bidder,
        "input => ({ ad: { funny: true }, bid: input.perBuyerSignals.foo * 2, renderUrl: 'https://ads.example/funnytoons' })",
    );
    let ufo_bidder = compile(
        &engine,
        "local://ufoBidder",
        FunctionRole::Bidder,
        "input => ({ ad: { funny: false }, bid: input.perBuyerSignals.foo * input.perBuyerSignals.engagement, renderUrl: 'https://ads.example/ufo' })",
    );
    let scorer_v1 = compile(
        &engine,
        "local://preferFunnyAds",
        FunctionRole::Scorer,
        "input => ({ desirabilityScore: input.adMetadata.funny ? input.bid * 2 : input.bid })",
    );

    let repository = Arc::new(registry_with(
        vec![
            ("local://funnytoonsBidder", Presence::Present(funnytoons_bidder.clone())),
            ("local://ufoBidder", Presence::Present(ufo_bidder.clone())),
        ],
        vec![("local://preferFunnyAds", Presence::Present(scorer_v1))],
    ));

    let driver = AuctionDriver::new(repository.clone(), engine.clone(), EngineOptions::default());

    let groups = vec![
        group(
            "adnetwork.example",
            "funnytoons",
            "local://funnytoonsBidder",
            "https://ads.example/funnytoons",
        ),
        group(
            "dsp.example",
            "ufoconspiracies",
            "local://ufoBidder",
            "https://ads.example/ufo",
        ),
    ];
    let config = funny_wins_config();

    let before = driver.run_ad_auction(&groups, &config, &FxHashMap::default()).unwrap();
    assert_eq!(before.winning_bid.unwrap().name, "funnytoons");

    let scorer_v2 = compile(
        &engine,
        "local://preferFunnyAds",
        FunctionRole::Scorer,
        "input => ({ desirabilityScore: input.adMetadata.funny ? input.bid * 1.5 : input.bid })",
    );
    repository.publish(Snapshot::new(
        {
            let mut m = FxHashMap::default();
            m.insert("local://funnytoonsBidder".into(), Presence::Present(funnytoons_bidder));
            m.insert("local://ufoBidder".into(), Presence::Present(ufo_bidder));
            m
        },
        {
            let mut m = FxHashMap::default();
            m.insert("local://preferFunnyAds".into(), Presence::Present(scorer_v2));
            m
        },
    ));

    let after = driver.run_ad_auction(&groups, &config, &FxHashMap::default()).unwrap();
    let winner = after.winning_bid.expect("ufoconspiracies should now win");
    assert_eq!(winner.name, "ufoconspiracies");
    assert_eq!(winner.desirability_score, 70.0);
    assert_eq!(after.losing_bids[0].name, "funnytoons");
    assert_eq!(after.losing_bids[0].desirability_score, 63.0);
}

/// A throwing bidder is skipped, not fatal to the whole auction.
#[test]
fn a_throwing_bidder_is_skipped_not_fatal() {
    let engine = Arc::new(InProcessSandbox::new());

    let throwing_bidder = compile(
        &engine,
        "local://throwingBidder",
        FunctionRole::Bidder,
        "input => ({ bid: 1000 + input.perBuyerSignals.foo.bar.baz, renderUrl: 'https://ads.example/a' })",
    );
    let valid_bidder = compile(
        &engine,
        "local://validBidder",
        FunctionRole::Bidder,
        "input => ({ bid: 60, renderUrl: 'https://ads.example/b' })",
    );
    let scorer = compile(
        &engine,
        "local://identityScorer",
        FunctionRole::Scorer,
        "input => ({ desirabilityScore: input.bid })",
    );

    let repository = Arc::new(registry_with(
        vec![
            ("local://throwingBidder", Presence::Present(throwing_bidder)),
            ("local://validBidder", Presence::Present(valid_bidder)),
        ],
        vec![("local://identityScorer", Presence::Present(scorer))],
    ));

    let driver = AuctionDriver::new(repository, engine, EngineOptions::default());

    let config = AuctionConfiguration {
        seller: "adnetwork.example".into(),
        decision_logic_url: "local://identityScorer".into(),
        interest_group_buyers: vec!["buyer-a".into(), "buyer-b".into()],
        auction_signals: json!(null),
        seller_signals: json!(null),
        per_buyer_signals: {
            let mut m = FxHashMap::default();
            m.insert("buyer-a".into(), json!({ "foo": 21 }));
            m
        },
    };

    let groups = vec![
        group("buyer-a", "A", "local://throwingBidder", "https://ads.example/a"),
        group("buyer-b", "B", "local://validBidder", "https://ads.example/b"),
    ];

    let response = driver
        .run_ad_auction(&groups, &config, &FxHashMap::default())
        .expect("auction should succeed despite A's bidder throwing");

    let winner = response.winning_bid.expect("B should win");
    assert_eq!(winner.name, "B");
    assert!(response.losing_bids.is_empty());
}

/// All ads filtered: every candidate scores zero, so there is no winner.
#[test]
fn all_zero_scores_yield_no_winner() {
    let engine = Arc::new(InProcessSandbox::new());

    let bidder = compile(
        &engine,
        "local://flatBidder",
        FunctionRole::Bidder,
        "input => ({ bid: 10, renderUrl: 'https://ads.example/x' })",
    );
    let zero_scorer = compile(
        &engine,
        "local://zeroScorer",
        FunctionRole::Scorer,
        "input => ({ desirabilityScore: 0 })",
    );

    let repository = Arc::new(registry_with(
        vec![("local://flatBidder", Presence::Present(bidder))],
        vec![("local://zeroScorer", Presence::Present(zero_scorer))],
    ));

    let driver = AuctionDriver::new(repository, engine, EngineOptions::default());

    let config = AuctionConfiguration {
        seller: "adnetwork.example".into(),
        decision_logic_url: "local://zeroScorer".into(),
        interest_group_buyers: vec!["buyer-a".into(), "buyer-b".into()],
        auction_signals: json!(null),
        seller_signals: json!(null),
        per_buyer_signals: FxHashMap::default(),
    };

    let groups = vec![
        group("buyer-a", "A", "local://flatBidder", "https://ads.example/x"),
        group("buyer-b", "B", "local://flatBidder", "https://ads.example/x"),
    ];

    let response = driver
        .run_ad_auction(&groups, &config, &FxHashMap::default())
        .unwrap();

    assert!(response.winning_bid.is_none());
    assert_eq!(response.losing_bids.len(), 2);
    assert!(response.losing_bids.iter().all(|b| b.desirability_score == 0.0));
}

/// A missing scorer fails the whole call with *not-found*.
#[test]
fn missing_scorer_fails_the_whole_auction() {
    let engine = Arc::new(InProcessSandbox::new());
    let bidder = compile(
        &engine,
        "local://bidder",
        FunctionRole::Bidder,
        "input => ({ bid: 10, renderUrl: 'https://ads.example/x' })",
    );
    let repository = Arc::new(registry_with(
        vec![("local://bidder", Presence::Present(bidder))],
        vec![],
    ));
    let driver = AuctionDriver::new(repository, engine, EngineOptions::default());

    let config = AuctionConfiguration {
        seller: "adnetwork.example".into(),
        decision_logic_url: "local://missingScorer".into(),
        interest_group_buyers: vec!["buyer-a".into()],
        auction_signals: json!(null),
        seller_signals: json!(null),
        per_buyer_signals: FxHashMap::default(),
    };
    let groups = vec![group("buyer-a", "A", "local://bidder", "https://ads.example/x")];

    let err = driver
        .run_ad_auction(&groups, &config, &FxHashMap::default())
        .unwrap_err();
    assert_eq!(err.kind(), auction_core::ErrorKind::NotFound);
}

/// An owner not in the allow-set is dropped silently, not reported as a
/// loser.
#[test]
fn owner_not_in_allow_set_is_dropped_silently() {
    let engine = Arc::new(InProcessSandbox::new());
    let bidder = compile(
        &engine,
        "local://bidder",
        FunctionRole::Bidder,
        "input => ({ bid: 10, renderUrl: 'https://ads.example/x' })",
    );
    let scorer = compile(
        &engine,
        "local://scorer",
        FunctionRole::Scorer,
        "input => ({ desirabilityScore: input.bid })",
    );
    let repository = Arc::new(registry_with(
        vec![("local://bidder", Presence::Present(bidder))],
        vec![("local://scorer", Presence::Present(scorer))],
    ));
    let driver = AuctionDriver::new(repository, engine, EngineOptions::default());

    let config = AuctionConfiguration {
        seller: "adnetwork.example".into(),
        decision_logic_url: "local://scorer".into(),
        interest_group_buyers: vec!["allowed-buyer".into()],
        auction_signals: json!(null),
        seller_signals: json!(null),
        per_buyer_signals: FxHashMap::default(),
    };
    let groups = vec![group("not-allowed-buyer", "A", "local://bidder", "https://ads.example/x")];

    let response = driver
        .run_ad_auction(&groups, &config, &FxHashMap::default())
        .unwrap();
    assert!(response.winning_bid.is_none());
    assert!(response.losing_bids.is_empty());
}

/// Zero eligible candidates -> OK, empty winner, empty losers.
#[test]
fn zero_candidates_is_ok_with_empty_winner_and_losers() {
    let engine = Arc::new(InProcessSandbox::new());
    let repository = Arc::new(registry_with(vec![], vec![]));
    let driver = AuctionDriver::new(repository, engine, EngineOptions::default());

    let config = AuctionConfiguration {
        seller: "adnetwork.example".into(),
        decision_logic_url: "local://anything".into(),
        interest_group_buyers: vec![],
        auction_signals: json!(null),
        seller_signals: json!(null),
        per_buyer_signals: FxHashMap::default(),
    };

    let response = driver.run_ad_auction(&[], &config, &FxHashMap::default()).unwrap();
    assert!(response.winning_bid.is_none());
    assert!(response.losing_bids.is_empty());
}
