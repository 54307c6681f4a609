use crate::service::Command;
use crate::utils::parse_timestamp;

/// A line typed on stdin
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    Player(Command),
    Help,
    Quit,
}

pub const HELP: &str = "\
search <query>      replace the queue with search results
play <n>            play queue entry n (1-based)
toggle | space      play / pause
next | n            next track
prev | p            previous track
seek <m:ss|secs>    jump to a position
ff <secs>           skip forward
rw <secs>           skip back
vol <0-100>         set volume
overlay open|close  pause for / resume after the video view
quit | q            exit";

pub fn parse_command(line: &str) -> Result<InputCommand, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line == " " {
        return Ok(InputCommand::Player(Command::TogglePlayPause));
    }
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "" | "toggle" | "pause" => Command::TogglePlayPause,
        "next" | "n" => Command::Advance(1),
        "prev" | "p" => Command::Advance(-1),
        "search" | "s" | "/" => {
            if rest.is_empty() {
                return Err("search needs a query".to_string());
            }
            Command::Search(rest.to_string())
        }
        "play" => {
            let n: usize = rest
                .parse()
                .map_err(|_| format!("not a queue number: {rest:?}"))?;
            if n == 0 {
                return Err("queue numbers start at 1".to_string());
            }
            Command::PlayIndex(n - 1)
        }
        "seek" => Command::Seek(
            parse_timestamp(rest).ok_or_else(|| format!("not a timestamp: {rest:?}"))?,
        ),
        "ff" | "rw" => {
            let ms = parse_timestamp(rest).ok_or_else(|| format!("not a duration: {rest:?}"))?;
            let ms = i64::try_from(ms).map_err(|_| "duration too large".to_string())?;
            Command::SeekBy(if word.eq_ignore_ascii_case("rw") { -ms } else { ms })
        }
        "vol" | "volume" => Command::SetVolume(
            rest.parse()
                .map_err(|_| format!("not a volume: {rest:?}"))?,
        ),
        "overlay" => match rest {
            "open" => Command::OverlayOpened,
            "close" => Command::OverlayClosed,
            _ => return Err("overlay takes open or close".to_string()),
        },
        "help" | "?" => return Ok(InputCommand::Help),
        "quit" | "q" | "exit" => return Ok(InputCommand::Quit),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(InputCommand::Player(command))
}
