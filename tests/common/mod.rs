//! Shared harness for the behavior tests: a scripted transport and upstream
//! payload builders in the current (`locale-v2`) schema.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use puckline_core::{
    CacheAsideStore, GameDate, HttpClient, HttpError, HttpRequest, HttpResponse, LeagueService,
    Puckline, Settings, UpstreamClient, Warehouse, WarehouseConfig,
};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://api.test/v1";

struct Route {
    suffix: String,
    responses: VecDeque<HttpResponse>,
}

/// Serves canned responses by URL suffix and records every requested URL.
///
/// A route answers with its scripted responses in order and keeps repeating
/// the last one. Unrouted URLs answer 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, suffix: &str, response: HttpResponse) -> &Self {
        let mut routes = self.routes.lock().expect("routes lock");
        match routes.iter_mut().find(|route| route.suffix == suffix) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                suffix: suffix.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    pub fn respond_json(&self, suffix: &str, body: Value) -> &Self {
        self.respond(suffix, HttpResponse::ok_json(body.to_string()))
    }

    pub fn respond_status(&self, suffix: &str, status: u16) -> &Self {
        self.respond(suffix, HttpResponse::with_status(status, "{}"))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_to(&self, suffix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.ends_with(suffix))
            .count()
    }

    fn next_response(&self, url: &str) -> HttpResponse {
        let mut routes = self.routes.lock().expect("routes lock");
        let Some(route) = routes.iter_mut().find(|route| url.ends_with(&route.suffix)) else {
            return HttpResponse::with_status(404, "{}");
        };
        if route.responses.len() > 1 {
            route.responses.pop_front().unwrap_or_else(|| HttpResponse::with_status(404, "{}"))
        } else {
            route
                .responses
                .front()
                .cloned()
                .unwrap_or_else(|| HttpResponse::with_status(404, "{}"))
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(request.url.clone());
        let response = self.next_response(&request.url);
        Box::pin(async move { Ok(response) })
    }
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.upstream.base_url = BASE_URL.to_string();
    settings.retry.base_delay_ms = 1;
    settings.retry.jitter = false;
    settings
}

pub fn upstream(http: &Arc<ScriptedHttpClient>, settings: &Settings) -> UpstreamClient {
    UpstreamClient::from_settings(http.clone(), settings)
}

pub fn in_memory_warehouse() -> Warehouse {
    Warehouse::open(WarehouseConfig::in_memory()).expect("in-memory warehouse")
}

/// Facade over the scripted transport with team discovery pinned to `today`.
pub fn puckline(
    http: &Arc<ScriptedHttpClient>,
    settings: &Settings,
    warehouse: Warehouse,
    today: GameDate,
) -> Puckline {
    let league = LeagueService::new(
        upstream(http, settings),
        CacheAsideStore::new(),
        &settings.cache,
    )
    .with_today(today);
    Puckline::from_league(league, settings, warehouse)
}

pub fn date(value: &str) -> GameDate {
    GameDate::parse(value).expect("valid date")
}

// -----------------------------------------------------------------------------
// locale-v2 payloads
// -----------------------------------------------------------------------------

/// `(id, place, common name, abbreviation)`
pub type TeamFixture = (i64, &'static str, &'static str, &'static str);

pub const TORONTO: TeamFixture = (10, "Toronto", "Maple Leafs", "TOR");
pub const EDMONTON: TeamFixture = (22, "Edmonton", "Oilers", "EDM");

pub fn standings(teams: &[TeamFixture]) -> Value {
    let rows: Vec<Value> = teams
        .iter()
        .map(|(id, place, common, abbrev)| {
            json!({
                "teamId": id,
                "teamName": {"default": format!("{place} {common}")},
                "teamCommonName": {"default": common},
                "placeName": {"default": place},
                "teamAbbrev": {"default": abbrev},
            })
        })
        .collect();
    json!({ "standings": rows })
}

/// `(id, first, last, country)`
pub type PlayerFixture = (i64, &'static str, &'static str, &'static str);

fn roster_entry((id, first, last, country): &PlayerFixture, position: &str) -> Value {
    json!({
        "id": id,
        "firstName": {"default": first},
        "lastName": {"default": last},
        "positionCode": position,
        "birthCountry": country,
    })
}

pub fn roster(forwards: &[PlayerFixture], goalies: &[PlayerFixture]) -> Value {
    json!({
        "forwards": forwards.iter().map(|p| roster_entry(p, "C")).collect::<Vec<_>>(),
        "defensemen": [],
        "goalies": goalies.iter().map(|p| roster_entry(p, "G")).collect::<Vec<_>>(),
    })
}

pub fn schedule(date: &str, game_ids: &[i64]) -> Value {
    let games: Vec<Value> = game_ids.iter().map(|id| json!({ "id": id })).collect();
    json!({
        "gameWeek": [
            { "date": date, "games": games },
            { "date": "1999-01-01", "games": [{ "id": 1 }] },
        ]
    })
}

pub fn skater_line(id: i64, name: &str, goals: u32, assists: u32) -> Value {
    json!({
        "playerId": id,
        "name": {"default": name},
        "position": "C",
        "goals": goals,
        "assists": assists,
        "points": goals + assists,
    })
}

pub fn goalie_line(id: i64, name: &str, saves: u32, save_pctg: f64) -> Value {
    json!({
        "playerId": id,
        "name": {"default": name},
        "position": "G",
        "saves": saves,
        "savePctg": save_pctg,
    })
}

pub fn boxscore(
    game_id: i64,
    state: &str,
    home: TeamFixture,
    away: TeamFixture,
    home_forwards: Vec<Value>,
    home_goalies: Vec<Value>,
) -> Value {
    let side = |(id, place, common, abbrev): TeamFixture, score: u32| {
        json!({
            "id": id,
            "placeName": {"default": place},
            "commonName": {"default": common},
            "abbrev": abbrev,
            "score": score,
        })
    };
    json!({
        "id": game_id,
        "gameState": state,
        "periodDescriptor": {"number": 3, "periodType": "REG"},
        "clock": {"timeRemaining": "04:12"},
        "homeTeam": side(home, 3),
        "awayTeam": side(away, 1),
        "playerByGameStats": {
            "homeTeam": {"forwards": home_forwards, "defense": [], "goalies": home_goalies},
            "awayTeam": {"forwards": [], "defense": [], "goalies": []},
        },
    })
}
