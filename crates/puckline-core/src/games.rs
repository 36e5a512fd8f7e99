//! Enriched game views for a date.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::Settings;
use crate::context::FetchContext;
use crate::domain::{
    sort_players, FeedPlayer, FeedSide, Game, GameDate, GamePlayer, GameStatus, GameTeam,
    GoalieStats, LiveFeed, PlayerKind, TeamRoster,
};
use crate::error::{ApiError, ApiErrorKind};
use crate::league::LeagueService;
use crate::reconciler::TeamRosterReconciler;
use crate::schema::trailing_game_id;

pub fn games_key(date: GameDate) -> String {
    format!("games:{date}")
}

/// Keyed by game id when the reference carries one, so a bare id and a path
/// to the same game share an entry.
pub fn live_feed_key(reference: &str) -> String {
    match trailing_game_id(reference) {
        Some(id) => format!("live:{id}"),
        None => format!("live:{}", reference.trim()),
    }
}

/// Builds [`Game`] views from live feeds and the team/roster catalog.
#[derive(Debug, Clone)]
pub struct GameAggregator {
    league: LeagueService,
    reconciler: TeamRosterReconciler,
    games_ttl: Duration,
    live_feed_ttl: Duration,
    player_lookup: bool,
}

impl GameAggregator {
    pub fn new(
        league: LeagueService,
        reconciler: TeamRosterReconciler,
        settings: &Settings,
    ) -> Self {
        Self {
            league,
            reconciler,
            games_ttl: settings.cache.games_ttl(),
            live_feed_ttl: settings.cache.live_feed_ttl(),
            player_lookup: settings.games.player_lookup,
        }
    }

    /// Games for a `YYYY-MM-DD` date.
    pub async fn get_games(&self, ctx: &FetchContext, date: &str) -> Result<Vec<Game>, ApiError> {
        let date = GameDate::parse(date)?;
        self.get_games_on(ctx, date).await
    }

    #[instrument(skip(self, ctx), fields(date = %date))]
    pub async fn get_games_on(
        &self,
        ctx: &FetchContext,
        date: GameDate,
    ) -> Result<Vec<Game>, ApiError> {
        self.league
            .cache()
            .get_or_load(&games_key(date), self.games_ttl, || async {
                let catalog = self.catalog(ctx).await?;
                let references = self
                    .league
                    .upstream()
                    .get_schedule_games_by_date(ctx, date)
                    .await?;
                debug!(games = references.len(), "resolved schedule");

                let mut games = Vec::with_capacity(references.len());
                for reference in references {
                    let feed = self.live_feed(ctx, &reference).await?;
                    let mut game = build_game(feed, &catalog);
                    if self.player_lookup {
                        self.backfill_from_lookup(ctx, &mut game).await?;
                    }
                    games.push(game);
                }
                Ok::<_, ApiError>(games)
            })
            .await
    }

    /// Best-effort catalog: anything but cancellation degrades to no
    /// enrichment.
    async fn catalog(&self, ctx: &FetchContext) -> Result<Vec<TeamRoster>, ApiError> {
        match self.reconciler.get_teams_with_rosters(ctx).await {
            Ok(catalog) => Ok(catalog),
            Err(err) if err.kind() == ApiErrorKind::Cancelled => Err(err),
            Err(err) => {
                warn!(error = %err, "team catalog unavailable, games will not be enriched");
                Ok(Vec::new())
            }
        }
    }

    async fn live_feed(&self, ctx: &FetchContext, reference: &str) -> Result<LiveFeed, ApiError> {
        let upstream = self.league.upstream();
        self.league
            .cache()
            .get_or_load(&live_feed_key(reference), self.live_feed_ttl, || {
                upstream.get_live_feed(ctx, reference)
            })
            .await
    }

    /// Fill nationality and link for players the catalog did not know.
    async fn backfill_from_lookup(
        &self,
        ctx: &FetchContext,
        game: &mut Game,
    ) -> Result<(), ApiError> {
        let players = game
            .home
            .players
            .iter_mut()
            .chain(game.away.players.iter_mut())
            .filter(|player| player.id > 0 && player.nationality.is_none());

        for player in players {
            match self.league.get_player(ctx, player.id).await {
                Ok(details) => {
                    player.nationality = details.nationality;
                    if player.link.is_none() {
                        player.link = details.link;
                    }
                }
                Err(err) if err.kind() == ApiErrorKind::Cancelled => return Err(err),
                Err(err) => {
                    debug!(player = player.id, error = %err, "player lookup failed, leaving blank");
                }
            }
        }
        Ok(())
    }
}

/// Merge a live feed with the catalog into a game view.
pub fn build_game(feed: LiveFeed, catalog: &[TeamRoster]) -> Game {
    Game {
        game_id: feed.game_id,
        status: GameStatus::from_state(&feed.state),
        home: build_side(feed.home, catalog),
        away: build_side(feed.away, catalog),
        time_remaining: feed.time_remaining,
        period: feed.period,
    }
}

fn build_side(side: FeedSide, catalog: &[TeamRoster]) -> GameTeam {
    let roster = catalog
        .iter()
        .find(|roster| side.team_id != 0 && roster.team.id == side.team_id);

    let mut players: Vec<GamePlayer> = side
        .players
        .into_iter()
        .filter(FeedPlayer::contributed)
        .map(|player| game_player(player, roster))
        .collect();
    sort_players(&mut players);

    match roster {
        Some(roster) => GameTeam {
            id: side.team_id,
            name: roster.team.name.clone().or(side.name),
            short_name: roster.team.short_name.clone().or(side.short_name),
            abbreviation: roster.team.abbreviation.clone().or(side.abbreviation),
            link: roster.team.link.clone(),
            goals: side.goals,
            players,
        },
        None => GameTeam {
            id: side.team_id,
            name: side.name,
            short_name: side.short_name,
            abbreviation: side.abbreviation,
            link: None,
            goals: side.goals,
            players,
        },
    }
}

fn game_player(player: FeedPlayer, roster: Option<&TeamRoster>) -> GamePlayer {
    let kind = player.kind();
    let known = roster.and_then(|roster| roster.find_player(player.id));
    let goalie = (kind == PlayerKind::Goalie).then(|| GoalieStats {
        saves: player.saves,
        save_percentage: player.save_percentage,
        save_shots_against: player.save_shots_against.clone(),
    });

    GamePlayer {
        id: player.id,
        full_name: player
            .full_name
            .or_else(|| known.and_then(|known| known.full_name.clone())),
        last_name: player
            .last_name
            .or_else(|| known.and_then(|known| known.last_name.clone())),
        nationality: known.and_then(|known| known.nationality.clone()),
        link: known.and_then(|known| known.link.clone()),
        kind,
        position: player.position_code,
        goals: player.goals,
        assists: player.assists,
        points: player.points,
        goalie,
    }
}
