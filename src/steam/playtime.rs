use std::collections::HashMap;

use super::models::SteamGame;

/// Annotate the recently played games with how many minutes were played
/// since the previous export.
///
/// Without a previous export the two-week figure stands in for the week.
/// Games seen before are diffed on lifetime playtime (never negative); new
/// ones fall back to the two-week figure and count as returning when their
/// lifetime playtime exceeds it.
pub fn weekly_playtime(current: Vec<SteamGame>, previous: Option<&[SteamGame]>) -> Vec<SteamGame> {
    let Some(previous) = previous else {
        return current
            .into_iter()
            .map(|mut game| {
                game.playtime_delta = Some(game.playtime_2weeks.unwrap_or(0));
                game.is_returning_game = Some(false);
                game
            })
            .collect();
    };

    let lookup: HashMap<u64, &SteamGame> = previous.iter().map(|game| (game.appid, game)).collect();

    current
        .into_iter()
        .map(|mut game| {
            match lookup.get(&game.appid) {
                Some(before) => {
                    game.playtime_delta =
                        Some(game.playtime_forever.saturating_sub(before.playtime_forever));
                    game.is_returning_game = Some(true);
                }
                None => {
                    let delta = game.playtime_2weeks.unwrap_or(0);
                    game.playtime_delta = Some(delta);
                    game.is_returning_game = Some(game.playtime_forever > delta);
                }
            }
            game
        })
        .collect()
}

pub fn total_playtime(games: &[SteamGame]) -> u64 {
    games.iter().filter_map(|game| game.playtime_delta).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(appid: u64, two_weeks: Option<u64>, forever: u64) -> SteamGame {
        SteamGame {
            appid,
            name: format!("Game {appid}"),
            playtime_2weeks: two_weeks,
            playtime_forever: forever,
            img_icon_url: String::new(),
            playtime_delta: None,
            is_returning_game: None,
        }
    }

    #[test]
    fn test_first_export_uses_two_week_playtime() {
        let games = weekly_playtime(vec![game(10, Some(120), 900), game(20, None, 30)], None);

        assert_eq!(games[0].playtime_delta, Some(120));
        assert_eq!(games[0].is_returning_game, Some(false));
        assert_eq!(games[1].playtime_delta, Some(0));
        assert_eq!(total_playtime(&games), 120);
    }

    #[test]
    fn test_known_game_uses_lifetime_delta() {
        let previous = vec![game(10, Some(60), 800)];
        let games = weekly_playtime(vec![game(10, Some(200), 950)], Some(&previous));

        assert_eq!(games[0].playtime_delta, Some(150));
        assert_eq!(games[0].is_returning_game, Some(true));
    }

    #[test]
    fn test_delta_never_negative() {
        let previous = vec![game(10, Some(60), 800)];
        let games = weekly_playtime(vec![game(10, Some(10), 700)], Some(&previous));
        assert_eq!(games[0].playtime_delta, Some(0));
    }

    #[test]
    fn test_unseen_game_returning_detection() {
        let previous = vec![game(99, Some(5), 5)];
        let games = weekly_playtime(
            vec![game(10, Some(45), 3000), game(11, Some(45), 45)],
            Some(&previous),
        );

        assert_eq!(games[0].playtime_delta, Some(45));
        assert_eq!(games[0].is_returning_game, Some(true));
        assert_eq!(games[1].is_returning_game, Some(false));
        assert_eq!(total_playtime(&games), 90);
    }
}
