use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use vignette_quiz::clients::{ClientType, FlexibleClient, MockResponse};
use vignette_quiz::interceptors::FileInterceptor;
use vignette_quiz::session::QuestionOutcome;
use vignette_quiz::{OptionKey, Quiz, QuizState, Session, Topic, VignetteGenerator};

#[derive(Parser)]
#[command(author, version, about = "Practice exam vignettes generated by a language model", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    GEMINI_API_KEY     API key for the Gemini client
    ANTHROPIC_API_KEY  API key for the Claude client
    DEEPSEEK_API_KEY   API key for the DeepSeek client
    RUST_LOG           Log filter (logs go to stderr)

EXAMPLES:
    quiz                              # Auto-detect client, pick a topic from the menu
    quiz --client mock                # Offline demo vignette
    quiz --topic fsa                  # Start straight on Financial Statement Analysis
    quiz --transcripts ./transcripts  # Save every prompt/response pair")]
struct Args {
    /// Client to use: gemini, claude, deepseek, mock [default: auto-detect]
    #[arg(short, long)]
    client: Option<ClientType>,

    /// Topic to start with (e.g. fsa, ethics, fixed-income)
    #[arg(short, long)]
    topic: Option<Topic>,

    /// Directory for prompt/response transcripts
    #[arg(long)]
    transcripts: Option<PathBuf>,
}

type Input = Lines<BufReader<Stdin>>;

enum Command {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    vignette_quiz::telemetry::init_tracing();
    let args = Args::parse();

    let client_type = args.client.unwrap_or_default();
    // the offline client only knows one case, so every topic maps to it
    let mut fixed_topic = None;
    let client = match client_type {
        ClientType::Mock => {
            let (client, handle) = FlexibleClient::mock();
            handle.set_fallback(MockResponse::json(&demo_payload()));
            fixed_topic = Some(DEMO_TOPIC);
            client
        }
        other => FlexibleClient::from_type(other)?,
    };
    println!("Using {} client", client_type);
    if let Some(topic) = fixed_topic {
        println!("Offline demo: every topic serves the same {} case.", topic);
    }

    let mut generator = VignetteGenerator::new(client);
    if let Some(dir) = args.transcripts {
        generator = generator.with_interceptor(Arc::new(FileInterceptor::new(dir)));
    }

    let mut quiz = Quiz::new(generator);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_topic = args.topic;

    loop {
        let command = match quiz.state().clone() {
            QuizState::NoSession { error } => {
                if let Some(message) = error {
                    println!("\n! {}", message);
                }
                let topic = match pending_topic.take() {
                    Some(topic) => Some(topic),
                    None => choose_topic(&mut input).await?,
                };
                match topic {
                    Some(chosen) => {
                        let topic = fixed_topic.unwrap_or(chosen);
                        if topic != chosen {
                            println!("\nNo offline case for {}; using {}.", chosen, topic);
                        }
                        println!("\nGenerating a {} vignette...", topic);
                        quiz.select_topic(topic).await?;
                        Command::Continue
                    }
                    None => Command::Quit,
                }
            }
            QuizState::Loading { .. } => Command::Continue,
            QuizState::Active(session) => {
                render_active(&session);
                active_turn(&mut quiz, &session, &mut input).await?
            }
            QuizState::Complete(session) => {
                render_review(&session);
                review_turn(&mut quiz, &mut input).await?
            }
        };

        if let Command::Quit = command {
            break;
        }
    }

    Ok(())
}

async fn read_line(input: &mut Input, prompt: &str) -> Result<Option<String>> {
    use std::io::Write;
    print!("{}", prompt);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

async fn choose_topic(input: &mut Input) -> Result<Option<Topic>> {
    println!("\nTopics:");
    for (i, topic) in Topic::ALL.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, topic);
    }

    loop {
        let Some(line) = read_line(input, "Pick a topic (number or name, q to quit): ").await? else {
            return Ok(None);
        };
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        if let Ok(n) = line.parse::<usize>() {
            if let Some(topic) = n.checked_sub(1).and_then(|i| Topic::ALL.get(i)) {
                return Ok(Some(*topic));
            }
        }
        match line.parse::<Topic>() {
            Ok(topic) => return Ok(Some(topic)),
            Err(e) => println!("{}", e),
        }
    }
}

fn render_active(session: &Session) {
    let vignette = session.vignette();
    println!("\n==== {} ====", vignette.title());
    println!("[{}]\n", vignette.topic());
    println!("{}\n", vignette.context());

    for (i, question) in vignette.questions().iter().enumerate() {
        println!("{}. {}", i + 1, question.question_text());
        for key in OptionKey::ALL {
            let marker = if session.answer_for(question.id()) == Some(key) { ">" } else { " " };
            println!("  {} {}. {}", marker, key, question.option(key));
        }
        println!();
    }
    println!(
        "{} of {} completed",
        session.answered_count(),
        vignette.questions().len()
    );
}

async fn active_turn<C>(quiz: &mut Quiz<C>, session: &Session, input: &mut Input) -> Result<Command>
where
    C: vignette_quiz::core::LowLevelClient,
{
    let Some(line) = read_line(input, "Answer as `<question> <A|B|C>`, `s` to submit, `q` to quit session: ").await? else {
        return Ok(Command::Quit);
    };

    match line.to_ascii_lowercase().as_str() {
        "q" => quiz.reset(),
        "s" if session.all_answered() => {
            quiz.submit()?;
        }
        "s" => println!("Answer every question before submitting."),
        _ => {
            let mut parts = line.split_whitespace();
            let parsed = match (parts.next(), parts.next()) {
                (Some(n), Some(k)) => n
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| session.vignette().questions().get(i))
                    .zip(k.parse::<OptionKey>().ok()),
                _ => None,
            };
            match parsed {
                Some((question, key)) => {
                    if let Err(e) = quiz.answer(question.id(), key) {
                        println!("{}", e);
                    }
                }
                None => println!("Could not read that; try e.g. `2 B`."),
            }
        }
    }
    Ok(Command::Continue)
}

fn render_review(session: &Session) {
    let vignette = session.vignette();
    println!("\n==== Performance: {} correct ====", session.score());
    println!("Time taken: {}s\n", session.elapsed().num_seconds());

    for (i, (question, outcome)) in session.review().into_iter().enumerate() {
        let verdict = match outcome {
            QuestionOutcome::Correct => "correct".to_string(),
            QuestionOutcome::Incorrect { chosen } => format!("incorrect (you chose {})", chosen),
            QuestionOutcome::Unanswered => "unanswered".to_string(),
        };
        println!("{}. {}", i + 1, question.question_text());
        println!(
            "   Answer: {}. {} - {}",
            question.correct_answer(),
            question.option(question.correct_answer()),
            verdict
        );
        println!("   Explanation: {}\n", question.explanation());
    }
    println!("Topic: {}", vignette.topic());
}

async fn review_turn<C>(quiz: &mut Quiz<C>, input: &mut Input) -> Result<Command>
where
    C: vignette_quiz::core::LowLevelClient,
{
    let Some(line) = read_line(input, "`n` new topic, `r` refresh case, `q` quit: ").await? else {
        return Ok(Command::Quit);
    };

    match line.to_ascii_lowercase().as_str() {
        "n" => quiz.reset(),
        "r" => {
            println!("\nGenerating a fresh case...");
            quiz.refresh().await?;
        }
        "q" => return Ok(Command::Quit),
        _ => println!("Unknown choice."),
    }
    Ok(Command::Continue)
}

const DEMO_TOPIC: Topic = Topic::Fsa;

/// Offline vignette served by the mock client.
fn demo_payload() -> serde_json::Value {
    json!({
        "title": "Harbor Lane Manufacturing: Inventory and Margins",
        "topic": "Financial Statement Analysis",
        "context": "Elena Ortiz, an analyst at a regional asset manager, is reviewing **Harbor Lane Manufacturing** ahead of an earnings call. Harbor Lane reports under US GAAP and switched from FIFO to LIFO three years ago.\n\nExhibit 1: Selected Financial Data (USD millions)\n\n| Item | 2023 | 2024 |\n|------|------|------|\n| Revenue | 820 | 905 |\n| Cost of goods sold | 574 | 642 |\n| LIFO reserve | 38 | 51 |\n| Ending inventory (LIFO) | 140 | 152 |\n\nOrtiz wants to compare Harbor Lane with an IFRS peer that uses FIFO.",
        "questions": [
            {
                "id": "q1",
                "questionText": "Harbor Lane's 2024 ending inventory on a FIFO basis is closest to:",
                "options": { "A": "152", "B": "203", "C": "191" },
                "correctAnswer": "B",
                "explanation": "FIFO inventory equals LIFO inventory plus the LIFO reserve: 152 + 51 = 203. A ignores the reserve; C adds the 2023 reserve."
            },
            {
                "id": "q2",
                "questionText": "Harbor Lane's 2024 cost of goods sold on a FIFO basis is closest to:",
                "options": { "A": "629", "B": "655", "C": "642" },
                "correctAnswer": "A",
                "explanation": "FIFO COGS equals LIFO COGS minus the increase in the LIFO reserve: 642 - (51 - 38) = 629. B adds the increase; C is the reported LIFO figure."
            },
            {
                "id": "q3",
                "questionText": "Relative to FIFO, Harbor Lane's LIFO choice most likely results in a 2024 gross margin that is:",
                "options": { "A": "higher", "B": "the same", "C": "lower" },
                "correctAnswer": "C",
                "explanation": "With rising costs (the LIFO reserve grew), LIFO COGS exceeds FIFO COGS, so the LIFO gross margin is lower."
            }
        ]
    })
}
