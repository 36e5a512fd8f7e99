//! Behavior-driven tests for game aggregation
//!
//! These tests verify how live box scores are merged with the roster
//! catalog: player filtering, ordering, status mapping and enrichment.

mod common;

use puckline_core::{ApiErrorKind, FetchContext, GameStatus, PlayerKind};
use serde_json::json;

use common::{
    boxscore, date, goalie_line, in_memory_warehouse, puckline, roster, schedule, settings,
    skater_line, standings, ScriptedHttpClient, EDMONTON, TORONTO,
};

const GAME_DATE: &str = "2024-11-15";

fn script_catalog(http: &ScriptedHttpClient) {
    http.respond_json("/standings/2024-10-01", standings(&[TORONTO, EDMONTON]))
        .respond_json(
            "/roster/TOR/current",
            roster(&[(34, "Auston", "Matthews", "USA")], &[(60, "Joseph", "Woll", "CAN")]),
        )
        .respond_json(
            "/roster/EDM/current",
            roster(&[(97, "Connor", "McDavid", "CAN")], &[]),
        );
}

// =============================================================================
// Ordering and filtering
// =============================================================================

#[tokio::test]
async fn when_feed_has_skater_and_goalie_then_skater_comes_first_with_three_points() {
    // Given: One game where a skater had 2 goals and 1 assist and the goalie
    // made 30 saves
    let http = ScriptedHttpClient::new();
    script_catalog(&http);
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &[2024020200]))
        .respond_json(
            "/gamecenter/2024020200/boxscore",
            boxscore(
                2024020200,
                "LIVE",
                TORONTO,
                EDMONTON,
                vec![
                    skater_line(16, "M. Marner", 0, 0),
                    skater_line(34, "A. Matthews", 2, 1),
                ],
                vec![goalie_line(60, "J. Woll", 30, 0.968)],
            ),
        );
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));

    // When: Games for the date are requested
    let games = service
        .get_games(&FetchContext::background(), GAME_DATE)
        .await
        .expect("games");

    // Then: The non-contributing skater is dropped and the skater leads
    assert_eq!(games.len(), 1);
    let players = &games[0].home.players;
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].id, 34);
    assert_eq!(players[0].kind, PlayerKind::Skater);
    assert_eq!(players[0].goals + players[0].assists, 3);
    assert_eq!(players[1].kind, PlayerKind::Goalie);
    assert_eq!(players[1].goalie.as_ref().map(|g| g.saves), Some(30));

    // And: Roster data backfills nationality and link
    assert_eq!(players[0].nationality.as_deref(), Some("USA"));
    assert_eq!(
        players[0].link.as_deref(),
        Some("https://api.test/v1/player/34/landing")
    );
    assert_eq!(games[0].home.name.as_deref(), Some("Toronto Maple Leafs"));
    assert_eq!(games[0].home.goals, 3);
    assert_eq!(games[0].period.as_deref(), Some("3rd"));
    assert_eq!(games[0].time_remaining.as_deref(), Some("04:12"));
}

#[tokio::test]
async fn when_player_is_not_on_any_roster_then_enrichment_is_left_blank() {
    // Given: A scorer unknown to the catalog
    let http = ScriptedHttpClient::new();
    script_catalog(&http);
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &[2024020201]))
        .respond_json(
            "/gamecenter/2024020201/boxscore",
            boxscore(
                2024020201,
                "FINAL",
                TORONTO,
                EDMONTON,
                vec![skater_line(8481000, "R. Call-Up", 1, 0)],
                Vec::new(),
            ),
        );
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));

    // When: Games are requested
    let games = service
        .get_games(&FetchContext::background(), GAME_DATE)
        .await
        .expect("games");

    // Then: The player is listed without nationality or link
    let player = &games[0].home.players[0];
    assert_eq!(player.id, 8481000);
    assert_eq!(player.nationality, None);
    assert_eq!(player.link, None);
    assert_eq!(http.calls_to("/player/8481000/landing"), 0);
}

#[tokio::test]
async fn when_player_lookup_is_enabled_then_unknown_players_are_fetched_best_effort() {
    // Given: Player lookup on, one landing that works and one that fails
    let http = ScriptedHttpClient::new();
    script_catalog(&http);
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &[2024020202]))
        .respond_json(
            "/gamecenter/2024020202/boxscore",
            boxscore(
                2024020202,
                "LIVE",
                TORONTO,
                EDMONTON,
                vec![
                    skater_line(8481000, "R. Call-Up", 1, 0),
                    skater_line(8481001, "T. Tryout", 0, 1),
                ],
                Vec::new(),
            ),
        )
        .respond_json(
            "/player/8481000/landing",
            json!({"playerId": 8481000, "firstName": {"default": "Ryan"}, "lastName": {"default": "Call-Up"}, "birthCountry": "SWE"}),
        )
        .respond_status("/player/8481001/landing", 500);
    let mut settings = settings();
    settings.games.player_lookup = true;
    let service = puckline(&http, &settings, in_memory_warehouse(), date(GAME_DATE));

    // When: Games are requested
    let games = service
        .get_games(&FetchContext::background(), GAME_DATE)
        .await
        .expect("lookup failures must not fail the request");

    // Then: The found player is enriched and the other stays blank
    let players = &games[0].home.players;
    assert_eq!(players[0].nationality.as_deref(), Some("SWE"));
    assert_eq!(players[1].nationality, None);
}

// =============================================================================
// Status mapping
// =============================================================================

#[tokio::test]
async fn when_feeds_report_raw_states_then_status_uses_fixed_mapping() {
    // Given: Four games in different raw states
    let http = ScriptedHttpClient::new();
    script_catalog(&http);
    let states = [
        (2024020301, "FINAL"),
        (2024020302, "OFF"),
        (2024020303, "FUT"),
        (2024020304, "CRIT"),
    ];
    let ids: Vec<i64> = states.iter().map(|(id, _)| *id).collect();
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &ids));
    for (id, state) in states {
        http.respond_json(
            &format!("/gamecenter/{id}/boxscore"),
            boxscore(id, state, TORONTO, EDMONTON, Vec::new(), Vec::new()),
        );
    }
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));

    // When: Games are requested
    let games = service
        .get_games(&FetchContext::background(), GAME_DATE)
        .await
        .expect("games");

    // Then: Each raw state maps to its coarse status, in schedule order
    let statuses: Vec<GameStatus> = games.iter().map(|game| game.status).collect();
    assert_eq!(
        statuses,
        vec![
            GameStatus::Final,
            GameStatus::Scheduled,
            GameStatus::Scheduled,
            GameStatus::InProgress,
        ]
    );
}

// =============================================================================
// Caching and failures
// =============================================================================

#[tokio::test]
async fn when_games_are_requested_twice_then_upstream_is_hit_once() {
    // Given: A scripted day with one game
    let http = ScriptedHttpClient::new();
    script_catalog(&http);
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &[2024020400]))
        .respond_json(
            "/gamecenter/2024020400/boxscore",
            boxscore(2024020400, "LIVE", TORONTO, EDMONTON, Vec::new(), Vec::new()),
        );
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));
    let ctx = FetchContext::background();

    // When: The same date is requested twice
    let first = service.get_games(&ctx, GAME_DATE).await.expect("first");
    let second = service.get_games(&ctx, GAME_DATE).await.expect("second");

    // Then: The second answer came from the cache
    assert_eq!(first, second);
    assert_eq!(http.calls_to("/schedule/2024-11-15"), 1);
    assert_eq!(http.calls_to("/gamecenter/2024020400/boxscore"), 1);
}

#[tokio::test]
async fn when_catalog_is_unavailable_then_games_use_feed_values() {
    // Given: No team source answers, but the game feed does
    let http = ScriptedHttpClient::new();
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &[2024020500]))
        .respond_json(
            "/gamecenter/2024020500/boxscore",
            boxscore(
                2024020500,
                "LIVE",
                TORONTO,
                EDMONTON,
                vec![skater_line(34, "A. Matthews", 1, 0)],
                Vec::new(),
            ),
        );
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));

    // When: Games are requested
    let games = service
        .get_games(&FetchContext::background(), GAME_DATE)
        .await
        .expect("enrichment is best effort");

    // Then: Names come from the feed and nothing is backfilled
    assert_eq!(games[0].home.name.as_deref(), Some("Toronto Maple Leafs"));
    assert_eq!(games[0].home.link, None);
    assert_eq!(games[0].home.players[0].nationality, None);
}

#[tokio::test]
async fn when_a_box_score_has_no_teams_then_games_fail_not_found() {
    // Given: A scheduled game whose box score is empty
    let http = ScriptedHttpClient::new();
    script_catalog(&http);
    http.respond_json("/schedule/2024-11-15", schedule(GAME_DATE, &[2024020600]))
        .respond_json("/gamecenter/2024020600/boxscore", json!({"gameState": "FUT"}));
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));

    // When: Games are requested
    let error = service
        .get_games(&FetchContext::background(), GAME_DATE)
        .await
        .expect_err("missing live feed");

    // Then: The request fails NotFound
    assert_eq!(error.kind(), ApiErrorKind::NotFound);
}

#[tokio::test]
async fn when_date_is_malformed_then_request_is_rejected_without_upstream_calls() {
    // Given: Any service
    let http = ScriptedHttpClient::new();
    let service = puckline(&http, &settings(), in_memory_warehouse(), date(GAME_DATE));

    // When: A malformed date is requested
    let error = service
        .get_games(&FetchContext::background(), "15/11/2024")
        .await
        .expect_err("bad date");

    // Then: It is an invalid request and nothing was fetched
    assert_eq!(error.kind(), ApiErrorKind::InvalidRequest);
    assert!(http.calls().is_empty());
}
