//! Host commands: feed consumption, one-off renders and template export.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use fs_err as fs;
use presence_core::{
    generate_template, load_assets, load_tracked_ids, AvatarFetcher, Card, Compositor,
    DiscordProfileClient, HttpAvatarFetcher, NoAvatarFetcher, NoProfileLookup, Palette,
    PresenceConfig, PresenceError, PresenceResolver, PresenceSnapshot, PresenceTracker,
    ProfileLookup, UpdateOutcome, UserId,
};
use presence_protocol::{parse_update, MAX_FEED_LINE_BYTES};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Core(#[from] PresenceError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Card consumer thread panicked")]
    ConsumerPanicked,
}

pub struct RunOptions {
    pub config: PresenceConfig,
    pub users_file: PathBuf,
    /// `None` reads the feed from stdin.
    pub feed: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub offline: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub lines: usize,
    pub malformed: usize,
    pub stored: usize,
    pub discarded: usize,
}

fn profile_lookup(
    config: &PresenceConfig,
    offline: bool,
) -> Result<Arc<dyn ProfileLookup>, HostError> {
    if offline {
        return Ok(Arc::new(NoProfileLookup));
    }
    match config.discord.token() {
        Some(token) => Ok(Arc::new(DiscordProfileClient::new(
            token,
            config.discord.api_base.clone(),
            config.discord.timeout(),
        )?)),
        None => {
            warn!(
                env = %config.discord.token_env,
                "No API token set; profiles come from event data only"
            );
            Ok(Arc::new(NoProfileLookup))
        }
    }
}

fn avatar_fetcher(
    config: &PresenceConfig,
    offline: bool,
) -> Result<Arc<dyn AvatarFetcher>, HostError> {
    if offline {
        return Ok(Arc::new(NoAvatarFetcher));
    }
    Ok(Arc::new(HttpAvatarFetcher::new(config.render.avatar_timeout())?))
}

/// File name for a user's card: the display name with path-hostile
/// characters replaced, or the ID when nothing usable remains.
pub fn card_file_name(snapshot: &PresenceSnapshot, id: UserId) -> String {
    let cleaned: String = snapshot
        .username
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '#' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        format!("{}.png", id)
    } else {
        format!("{}.png", cleaned)
    }
}

pub fn write_card(card: &Card, path: &Path) -> Result<(), HostError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    card.encode_png(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn render_to_dir(tracker: &PresenceTracker, id: UserId, output_dir: &Path) {
    // Copy the snapshot once so the file name and the card agree.
    let Some(snapshot) = tracker.get(id) else {
        debug!(user_id = %id, "Snapshot gone before render");
        return;
    };
    let card = tracker.render_snapshot(&snapshot);
    let path = output_dir.join(card_file_name(&snapshot, id));
    match write_card(&card, &path) {
        Ok(()) => info!(user_id = %id, path = %path.display(), "Card written"),
        Err(err) => warn!(user_id = %id, error = %err, "Failed to write card"),
    }
}

/// Drops the remainder of an oversized line, up to and including its newline.
fn discard_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (found, used) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&byte| byte == b'\n') {
                Some(pos) => (true, pos + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

/// Feeds newline-delimited updates into the tracker. Oversized, non-UTF-8
/// and otherwise malformed lines are logged and skipped; only a failing
/// reader ends the feed early.
pub fn consume_feed<R: BufRead>(
    mut reader: R,
    tracker: &PresenceTracker,
) -> Result<FeedStats, HostError> {
    let mut stats = FeedStats::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // One byte past the limit is enough to tell an oversized line apart.
        let read = reader
            .by_ref()
            .take(MAX_FEED_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }

        let terminated = buf.last() == Some(&b'\n');
        if !terminated && buf.len() > MAX_FEED_LINE_BYTES {
            discard_line(&mut reader)?;
            stats.lines += 1;
            stats.malformed += 1;
            warn!(
                line = stats.lines,
                code = "line_too_large",
                "Skipping feed line"
            );
            continue;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim_end_matches(&['\n', '\r'][..]),
            Err(err) => {
                stats.lines += 1;
                stats.malformed += 1;
                warn!(
                    line = stats.lines,
                    code = "invalid_utf8",
                    error = %err,
                    "Skipping feed line"
                );
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let update = match parse_update(line) {
            Ok(update) => update,
            Err(err) => {
                stats.malformed += 1;
                warn!(
                    line = stats.lines,
                    code = %err.code,
                    message = %err.message,
                    "Skipping feed line"
                );
                continue;
            }
        };

        match tracker.handle_update(&update) {
            UpdateOutcome::Stored => stats.stored += 1,
            UpdateOutcome::Discarded => stats.discarded += 1,
        }
    }
    Ok(stats)
}

pub fn run(options: RunOptions) -> Result<FeedStats, HostError> {
    let RunOptions {
        config,
        users_file,
        feed,
        output_dir,
        offline,
    } = options;

    let assets = Arc::new(load_assets(&config.assets, &config.render)?);
    let resolver = PresenceResolver::with_cdn_base(
        profile_lookup(&config, offline)?,
        config.discord.cdn_base.clone(),
    );
    let mode = config.notifications.mode();
    let tracker = Arc::new(PresenceTracker::new(
        mode,
        resolver,
        assets,
        avatar_fetcher(&config, offline)?,
    ));

    let ids = load_tracked_ids(&users_file)?;
    info!(count = ids.len(), path = %users_file.display(), "Tracking users");
    tracker.track(ids);
    fs::create_dir_all(&output_dir)?;

    let reader: Box<dyn BufRead> = match feed.as_deref() {
        Some(path) => Box::new(BufReader::new(fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let consumer = if mode.is_enabled() {
        let notifications = tracker.subscribe()?;
        let tracker = Arc::clone(&tracker);
        let output_dir = output_dir.clone();
        Some(thread::spawn(move || {
            for id in notifications {
                render_to_dir(&tracker, id, &output_dir);
            }
        }))
    } else {
        None
    };

    let stats = consume_feed(reader, &tracker);

    tracker.close_notifications();
    if let Some(consumer) = consumer {
        consumer.join().map_err(|_| HostError::ConsumerPanicked)?;
    } else {
        // Passive mode: one card per user with data, after the feed ends.
        for id in tracker.registry().tracked_ids() {
            render_to_dir(&tracker, id, &output_dir);
        }
    }

    let stats = stats?;
    info!(
        lines = stats.lines,
        stored = stats.stored,
        discarded = stats.discarded,
        malformed = stats.malformed,
        "Feed finished"
    );
    Ok(stats)
}

pub fn render_one(
    config: &PresenceConfig,
    snapshot_path: &Path,
    output: &Path,
    offline: bool,
) -> Result<(), HostError> {
    let content = fs::read_to_string(snapshot_path)?;
    let snapshot: PresenceSnapshot =
        serde_json::from_str(&content).map_err(|source| PresenceError::Json {
            context: format!("snapshot {}", snapshot_path.display()),
            source,
        })?;

    let assets = Arc::new(load_assets(&config.assets, &config.render)?);
    let compositor = Compositor::new(assets, avatar_fetcher(config, offline)?);
    write_card(&compositor.render(&snapshot), output)?;
    info!(path = %output.display(), "Card written");
    Ok(())
}

pub fn write_template(output: &Path) -> Result<(), HostError> {
    let template = Card::from(generate_template(&Palette::default()));
    write_card(&template, output)?;
    info!(path = %output.display(), "Template written");
    Ok(())
}
