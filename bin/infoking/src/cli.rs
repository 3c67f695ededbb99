//! Line-oriented terminal front end over the orchestrator.

use std::path::PathBuf;

use ik_app::{ImageFile, Modal, NoticeLevel, Orchestrator, ShowcaseUpload, View};
use ik_core::{AppCategory, BuilderOption, Credentials, Idea, SortOption, Thread};

pub const HELP: &str = "\
Views:     home | history | apps | forum
Ideas:     generate | sort default|high|low | clear | export [FILE]
Tools:     brainstorm N | mockup N | deck N | build N starter|studio|replit | close
Showcase:  upload NAME | DESCRIPTION | IMAGE_PATH [| URL [| CATEGORY]]
Forum:     post TEXT | share N TEXT | reply POST_ID TEXT
Account:   signin EMAIL PASSWORD | signup EMAIL PASSWORD | oauth PROVIDER | signout
Other:     notices | dismiss ID | online | offline | refresh | about | donate | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(View),
    Generate,
    Sort(SortOption),
    Clear,
    Export(Option<PathBuf>),
    Brainstorm(usize),
    Mockup(usize),
    Deck(usize),
    Build(usize, BuilderOption),
    Close,
    Upload {
        name: String,
        description: String,
        image: PathBuf,
        url: Option<String>,
        category: AppCategory,
    },
    Post(String),
    Share(usize, String),
    Reply(String, String),
    SignIn(String, String),
    SignUp(String, String),
    OAuth(String),
    SignOut,
    Notices,
    Dismiss(u64),
    Online(bool),
    Refresh,
    About,
    Donate,
    Help,
    Quit,
}

fn index(arg: Option<&str>) -> Result<usize, String> {
    arg.and_then(|a| a.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| "expected an idea number (see `history`)".to_string())
}

fn pair(rest: &str, what: &str) -> Result<(String, String), String> {
    match rest.split_whitespace().collect::<Vec<_>>()[..] {
        [a, b] => Ok((a.to_string(), b.to_string())),
        _ => Err(format!("usage: {what}")),
    }
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let command = match head.to_lowercase().as_str() {
        "home" => Command::Show(View::Home),
        "history" | "ideas" => Command::Show(View::History),
        "apps" => Command::Show(View::Apps),
        "forum" => Command::Show(View::Forum),
        "generate" | "g" => Command::Generate,
        "sort" => Command::Sort(match args.next() {
            Some("default") | None => SortOption::Default,
            Some("high") => SortOption::MarketSizeDesc,
            Some("low") => SortOption::MarketSizeAsc,
            Some(other) => return Err(format!("unknown sort `{other}`")),
        }),
        "clear" => Command::Clear,
        "export" => Command::Export(args.next().map(PathBuf::from)),
        "brainstorm" => Command::Brainstorm(index(args.next())?),
        "mockup" => Command::Mockup(index(args.next())?),
        "deck" => Command::Deck(index(args.next())?),
        "build" => {
            let n = index(args.next())?;
            let option = match args.next() {
                Some("starter") => BuilderOption::StarterCode,
                Some("studio") => BuilderOption::AiStudio,
                Some("replit") => BuilderOption::Replit,
                _ => return Err("usage: build N starter|studio|replit".to_string()),
            };
            Command::Build(n, option)
        }
        "close" => Command::Close,
        "upload" => {
            let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
            if fields.len() < 3 {
                return Err("usage: upload NAME | DESCRIPTION | IMAGE_PATH [| URL [| CATEGORY]]".to_string());
            }
            Command::Upload {
                name: fields[0].to_string(),
                description: fields[1].to_string(),
                image: PathBuf::from(fields[2]),
                url: fields.get(3).filter(|u| !u.is_empty()).map(|u| u.to_string()),
                category: fields.get(4).map(|c| AppCategory::from_label(c)).unwrap_or(AppCategory::Other),
            }
        }
        "post" if !rest.is_empty() => Command::Post(rest.to_string()),
        "share" => {
            let n = index(args.next())?;
            let text: Vec<&str> = args.collect();
            Command::Share(n, text.join(" "))
        }
        "reply" => {
            let id = args.next().ok_or("usage: reply POST_ID TEXT")?.to_string();
            let text: Vec<&str> = args.collect();
            Command::Reply(id, text.join(" "))
        }
        "signin" => {
            let (email, password) = pair(rest, "signin EMAIL PASSWORD")?;
            Command::SignIn(email, password)
        }
        "signup" => {
            let (email, password) = pair(rest, "signup EMAIL PASSWORD")?;
            Command::SignUp(email, password)
        }
        "oauth" => Command::OAuth(args.next().ok_or("usage: oauth PROVIDER")?.to_string()),
        "signout" => Command::SignOut,
        "notices" => Command::Notices,
        "dismiss" => Command::Dismiss(
            args.next()
                .and_then(|a| a.parse().ok())
                .ok_or("usage: dismiss ID")?,
        ),
        "online" => Command::Online(true),
        "offline" => Command::Online(false),
        "refresh" => Command::Refresh,
        "about" => Command::About,
        "donate" => Command::Donate,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command `{other}`, try `help`")),
    };
    Ok(command)
}

fn print_ideas(ideas: &[Idea]) {
    if ideas.is_empty() {
        println!("No ideas yet. Run `generate`.");
    }
    for (i, idea) in ideas.iter().enumerate() {
        println!(
            "{:>2}. [{}] market size {}/100\n    Problem:  {}\n    Solution: {}",
            i + 1,
            idea.category.as_str(),
            idea.market_size_score,
            idea.problem,
            idea.solution
        );
        if let Some(source) = &idea.source {
            println!("    Seen on {}: {}", source.platform, source.url);
        }
    }
}

fn print_thread(thread: &Thread, depth: usize) {
    let pad = "  ".repeat(depth);
    let post = &thread.post;
    println!(
        "{pad}- {} · {} · {}\n{pad}  {}",
        post.author,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.id,
        post.content
    );
    if let Some(idea) = &post.idea {
        println!("{pad}  ↳ idea: {}", idea.problem);
    }
    for reply in &thread.replies {
        print_thread(reply, depth + 1);
    }
}

pub fn render(app: &Orchestrator) {
    let state = app.state();
    let who = app
        .session()
        .current_user()
        .map(|u| u.email)
        .unwrap_or_else(|| "anonymous".to_string());
    println!(
        "── {} · {} · sort: {}{} ──",
        state.view.label(),
        who,
        state.sort.label(),
        if state.online { "" } else { " · OFFLINE" }
    );

    match state.view {
        View::Home => println!("Find your next app idea from real user complaints. Run `generate`."),
        View::History => print_ideas(&app.sorted_ideas()),
        View::Apps => {
            for entry in app.showcase_apps() {
                println!("* {} [{}] {}", entry.name, entry.category.as_str(), entry.description);
                if let Some(url) = entry.app_url {
                    println!("  {url}");
                }
            }
        }
        View::Forum => {
            let threads = app.forum_threads();
            if threads.is_empty() {
                println!("No posts yet. Start one with `post TEXT`.");
            }
            for thread in &threads {
                print_thread(thread, 0);
            }
        }
    }

    match &state.modal {
        Some(Modal::Auth) => {
            println!("[sign in] `signin EMAIL PASSWORD`, `signup EMAIL PASSWORD` or `oauth PROVIDER`");
            if let Some(error) = &state.auth_error {
                println!("  ! {error}");
            }
        }
        Some(Modal::About) => println!("[about] InfoKing turns real complaints into app ideas with AI."),
        Some(Modal::Donation) => println!("[donate] Thanks for supporting InfoKing!"),
        Some(_) if state.job.running => {
            println!("[working] {}", state.job.deck_progress.as_deref().unwrap_or("Generating..."));
        }
        _ => {}
    }
    if let Some(text) = &state.job.brainstorm {
        println!("{text}");
    }
    if let Some(url) = &state.job.mockup_url {
        println!("[mockup] {} bytes of image data", url.len());
    }
    if let Some(slides) = &state.job.deck {
        for slide in slides {
            println!("Slide {}: {}\n  {}", slide.slide, slide.title, slide.content);
        }
    }
    if let Some(text) = &state.job.builder_text {
        println!("{text}");
    }

    for notice in &state.notices {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        println!("({tag} #{}) {}", notice.id, notice.message);
    }
}

fn idea_id(app: &Orchestrator, n: usize) -> Option<String> {
    app.sorted_ideas().get(n - 1).map(|i| i.id.clone())
}

/// Executes one command. Failures are already recorded as notices by the
/// orchestrator, so results are only inspected for their payload.
pub async fn execute(app: &Orchestrator, command: Command) -> bool {
    let missing = || println!("No idea with that number. See `history`.");
    match command {
        Command::Show(view) => app.set_view(view),
        Command::Generate => {
            println!("Searching for new ideas...");
            if app.fetch_new_ideas().await.is_ok() {
                app.set_view(View::History);
            }
        }
        Command::Sort(sort) => app.set_sort(sort),
        Command::Clear => {
            let _ = app.clear_ideas().await;
        }
        Command::Export(path) => match (app.export_ideas_json(), path) {
            (Ok(json), Some(path)) => match tokio::fs::write(&path, json).await {
                Ok(()) => println!("Exported to {}", path.display()),
                Err(e) => println!("Could not write {}: {e}", path.display()),
            },
            (Ok(json), None) => println!("{json}"),
            (Err(e), _) => println!("Export failed: {e}"),
        },
        Command::Brainstorm(n) => match idea_id(app, n) {
            Some(id) => {
                let _ = app.brainstorm(&id).await;
            }
            None => missing(),
        },
        Command::Mockup(n) => match idea_id(app, n) {
            Some(id) => {
                let _ = app.mockup(&id).await;
            }
            None => missing(),
        },
        Command::Deck(n) => match idea_id(app, n) {
            Some(id) => {
                let _ = app.pitch_deck(&id).await;
            }
            None => missing(),
        },
        Command::Build(n, option) => match idea_id(app, n) {
            Some(id) => {
                println!("{}...", option.label());
                let _ = app.builder_prompt(&id, option).await;
            }
            None => missing(),
        },
        Command::Close => app.close_modal(),
        Command::Upload {
            name,
            description,
            image,
            url,
            category,
        } => {
            app.open_modal(Modal::Upload);
            let image = match tokio::fs::read(&image).await {
                Ok(bytes) => Some(ImageFile {
                    file_name: image.to_string_lossy().into_owned(),
                    bytes,
                }),
                Err(e) => {
                    println!("Could not read {}: {e}", image.display());
                    None
                }
            };
            let upload = ShowcaseUpload {
                name,
                description,
                image,
                app_url: url,
                category,
            };
            if app.submit_showcase_app(upload).await.is_ok() {
                app.set_view(View::Apps);
            }
        }
        Command::Post(text) => {
            let _ = app.submit_forum_post(&text, None, None).await;
        }
        Command::Share(n, text) => match idea_id(app, n) {
            Some(id) => {
                let _ = app.submit_forum_post(&text, Some(&id), None).await;
            }
            None => missing(),
        },
        Command::Reply(parent, text) => {
            let _ = app.submit_forum_post(&text, None, Some(parent)).await;
        }
        Command::SignIn(email, password) => {
            let _ = app.sign_in(&Credentials::new(email, password)).await;
        }
        Command::SignUp(email, password) => {
            let _ = app.sign_up(&Credentials::new(email, password)).await;
        }
        Command::OAuth(provider) => {
            let _ = app.sign_in_with_provider(&provider).await;
        }
        Command::SignOut => {
            let _ = app.sign_out().await;
        }
        Command::Notices => {}
        Command::Dismiss(id) => app.dismiss_notice(id),
        Command::Online(online) => app.set_online(online),
        Command::Refresh => {
            app.refresh().await;
        }
        Command::About => app.open_modal(Modal::About),
        Command::Donate => app.open_modal(Modal::Donation),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("generate"), Ok(Command::Generate));
        assert_eq!(parse("sort high"), Ok(Command::Sort(SortOption::MarketSizeDesc)));
        assert_eq!(parse("build 2 replit"), Ok(Command::Build(2, BuilderOption::Replit)));
        assert_eq!(
            parse("signin a@b.co secret1"),
            Ok(Command::SignIn("a@b.co".into(), "secret1".into()))
        );
        assert_eq!(parse("share 1 look at this"), Ok(Command::Share(1, "look at this".into())));
    }

    #[test]
    fn test_parse_upload_fields() {
        let parsed = parse("upload Pocket Vet | Pet symptom checker | ./vet.png | https://pocket.vet | health").unwrap();
        assert_eq!(
            parsed,
            Command::Upload {
                name: "Pocket Vet".into(),
                description: "Pet symptom checker".into(),
                image: PathBuf::from("./vet.png"),
                url: Some("https://pocket.vet".into()),
                category: AppCategory::Health,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse("brainstorm 0").is_err());
        assert!(parse("build 1 cobol").is_err());
        assert!(parse("post").is_err());
        assert!(parse("fly").is_err());
    }
}
