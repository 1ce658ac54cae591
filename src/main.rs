//! Application entry point for the A·chik Bible reader.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime.
//! 4. Open the content store and build the remote client.
//! 5. Open the audio output device (timed fallback when there is none).
//! 6. Spawn the playback engine and the event printer.
//! 7. Run the console loop until `quit` or end of input.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use achik_bible::{
    audio::{AudioSink, AudioSynthesizer, CpalSink, TimedSink},
    config::AppConfig,
    console::{parse_command, ConsoleCommand, HELP},
    content::{BookDownloader, ContentFetcher, FetchedChapter, RetryPolicy},
    model::{Testament, BOOKS},
    playback::{PlaybackCommand, PlaybackEngine, PlaybackEvent, PlaybackState, Target},
    reader::{lookup, Reader, ReaderError},
    remote::GeminiClient,
    store::ContentStore,
};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_chapter(fetched: &FetchedChapter) {
    let chapter = &fetched.chapter;
    println!();
    println!(
        "== {} {} ({:?}) ==",
        chapter.book_name, chapter.chapter_number, fetched.source
    );
    for verse in &chapter.verses {
        println!("{:>3}. {}", verse.number, verse.text);
    }
    println!();
}

fn describe(state: &PlaybackState) -> String {
    match state {
        PlaybackState::Idle => "idle".into(),
        PlaybackState::Loading(Target::Verse(i)) => format!("loading verse {}", i + 1),
        PlaybackState::Loading(Target::Summary) => "loading reflection".into(),
        PlaybackState::Playing(Target::Verse(i)) => format!("playing verse {}", i + 1),
        PlaybackState::Playing(Target::Summary) => "playing reflection".into(),
        PlaybackState::Error { target, message } => {
            let hint = match target {
                Target::Verse(_) => "retry | skip | dismiss",
                Target::Summary => "retry | dismiss",
            };
            format!("{message} ({hint})")
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<PlaybackEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::StateChanged(state) => println!("[{}] {}", state.label(), describe(&state)),
            PlaybackEvent::VerseFinished(i) => log::debug!("verse {} finished", i + 1),
            PlaybackEvent::SummaryText(text) => println!("\n{text}\n"),
            PlaybackEvent::RateChanged(rate) => println!("[rate] {rate:.2}x"),
            PlaybackEvent::VoiceChanged(voice) => println!("[voice] {voice}: {}", voice.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

enum Flow {
    Continue,
    Quit,
}

async fn handle(
    reader: &mut Reader,
    config: &mut AppConfig,
    command: ConsoleCommand,
) -> Result<Flow, ReaderError> {
    match command {
        ConsoleCommand::Open { book, chapter } => print_chapter(&reader.open(&book, chapter).await?),
        ConsoleCommand::Next => print_chapter(&reader.next().await?),
        ConsoleCommand::Prev => print_chapter(&reader.prev().await?),
        ConsoleCommand::Play(verse) => {
            if reader.current().is_none() {
                println!("open a chapter first");
            } else {
                reader
                    .command(PlaybackCommand::PlayVerse(verse.unwrap_or(0)))
                    .await?;
            }
        }
        ConsoleCommand::Toggle => reader.command(PlaybackCommand::Toggle).await?,
        ConsoleCommand::Stop => reader.command(PlaybackCommand::Stop).await?,
        ConsoleCommand::Summary => reader.command(PlaybackCommand::PlaySummary).await?,
        ConsoleCommand::Retry => {
            // A chapter that failed to load is retried before playback.
            if reader.current().is_none() && reader.position().is_some() {
                print_chapter(&reader.reload().await?);
            } else {
                reader.command(PlaybackCommand::Retry).await?;
            }
        }
        ConsoleCommand::Skip => reader.command(PlaybackCommand::Skip).await?,
        ConsoleCommand::Dismiss => reader.command(PlaybackCommand::Dismiss).await?,
        ConsoleCommand::Rate(rate) => {
            reader.command(PlaybackCommand::SetRate(rate)).await?;
            match config.playback.set_rate(rate) {
                Some(_) => save(config),
                None => println!("`{rate}` is not a usable speed"),
            }
        }
        ConsoleCommand::Voice(voice) => {
            reader.command(PlaybackCommand::SetVoice(voice)).await?;
            config.playback.voice = voice;
            save(config);
        }
        ConsoleCommand::Download(query) => {
            let book = lookup(&query)?;
            let downloader = reader.downloader();
            tokio::spawn(async move {
                let result = downloader
                    .download_book(book, |chapter, pct| {
                        println!("[download] {} {chapter}: {pct}%", book.name)
                    })
                    .await;
                match result {
                    Ok(report) if report.is_complete() => {
                        println!("[download] {} saved offline", book.name)
                    }
                    Ok(report) => println!(
                        "[download] {}: {}/{} chapters, failed {:?}",
                        book.name, report.succeeded, report.requested, report.failed
                    ),
                    Err(e) => println!("[download] {e}"),
                }
            });
        }
        ConsoleCommand::Progress(query) => {
            let progress = reader.book_progress(&query)?;
            println!(
                "{}/{} chapters offline ({}%){}",
                progress.cached,
                progress.total,
                progress.percent,
                if progress.complete { " ✓" } else { "" }
            );
        }
        ConsoleCommand::Books => {
            for testament in [Testament::Old, Testament::New] {
                println!("{testament:?} Testament");
                for book in BOOKS.iter().filter(|b| b.testament == testament) {
                    println!("  {:<4} {:<18} {:>3}", book.id, book.name, book.chapters);
                }
            }
        }
        ConsoleCommand::Daily => {
            let daily = reader.daily_highlight().await;
            println!("\n\"{}\"\n  ({})\n", daily.verse, daily.reference);
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn save(config: &AppConfig) {
    if let Err(e) = config.save() {
        log::warn!("could not save settings: {e}");
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

async fn run(mut config: AppConfig) -> anyhow::Result<()> {
    // 4. Store + remote
    let cache_dir = config.storage.resolve_cache_dir();
    let store = Arc::new(ContentStore::open(&cache_dir));
    let gemini = Arc::new(GeminiClient::from_config(&config.remote));

    let fetcher = Arc::new(ContentFetcher::new(
        store,
        gemini.clone(),
        RetryPolicy::from_config(&config.fetch),
    ));
    let downloader = Arc::new(BookDownloader::new(
        Arc::clone(&fetcher),
        Duration::from_millis(config.fetch.download_pacing_ms),
    ));
    let synth = Arc::new(AudioSynthesizer::new(
        gemini,
        config.playback.sample_rate,
        config.playback.channels,
    ));

    // 5. Audio output
    let sink: Arc<dyn AudioSink> = match CpalSink::open() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            log::warn!("Audio output unavailable ({e}); playback will be silent");
            Arc::new(TimedSink::new())
        }
    };

    // 6. Playback engine
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::channel::<PlaybackCommand>(16);
    let engine = PlaybackEngine::new(
        Arc::clone(&fetcher),
        synth,
        sink,
        &config.playback,
        events_tx,
    );
    let engine_task = tokio::spawn(engine.run(commands_rx));
    tokio::spawn(print_events(events_rx));

    // 7. Console
    let mut reader = Reader::new(fetcher, downloader, commands_tx);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(achik_bible::console::CommandError::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match handle(&mut reader, &mut config, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(ReaderError::EngineGone) => {
                log::error!("playback engine stopped unexpectedly");
                break;
            }
            Err(e) => println!("{e}"),
        }
    }

    // Dropping the reader closes the command channel and stops the engine.
    drop(reader);
    let _ = engine_task.await;
    log::info!("A·chik Bible shutting down");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("A·chik Bible starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if config.remote.api_key.is_none() {
        log::warn!("No API key configured; only cached chapters can be read");
    }

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}
