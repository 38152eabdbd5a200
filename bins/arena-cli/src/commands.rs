use anyhow::{bail, Context, Result};
use arena_common::types::Role;
use arena_common::{Config, Language, Problem, RedisStore, Store, User};
use arena_judge::{Judge0Gateway, Orchestrator, PollPolicy};
use std::fs;
use std::sync::Arc;
use uuid::Uuid;

async fn connect(config: &Config) -> Result<RedisStore> {
    RedisStore::connect(&config.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))
}

/// Parse a problem document, assigning an id when the file has none.
pub fn problem_from_json(raw: &str, creator: Uuid) -> Result<Problem> {
    let mut doc: serde_json::Value =
        serde_json::from_str(raw).context("Problem file is not valid JSON")?;
    let obj = match doc.as_object_mut() {
        Some(obj) => obj,
        None => bail!("Problem file must contain a JSON object"),
    };
    if !obj.contains_key("id") {
        obj.insert("id".to_string(), serde_json::json!(Uuid::new_v4()));
    }
    obj.insert("problemCreator".to_string(), serde_json::json!(creator));

    let problem: Problem =
        serde_json::from_value(doc).context("Problem file does not match the problem schema")?;
    problem
        .validate()
        .with_context(|| format!("Problem '{}' is incomplete", problem.title))?;
    Ok(problem)
}

/// Keep the stored id and creator; everything else comes from the new document.
pub fn replacement_problem(raw: &str, existing: &Problem) -> Result<Problem> {
    let mut problem = problem_from_json(raw, existing.problem_creator)?;
    problem.id = existing.id;
    Ok(problem)
}

async fn verify_references(config: &Config, store: &RedisStore, problem: &Problem) -> Result<()> {
    println!("🔍 Verifying reference solutions against visible test cases...");
    let gateway = Judge0Gateway::from_config(config)?;
    let orchestrator = Orchestrator::new(
        Arc::new(gateway),
        Arc::new(store.clone()),
        PollPolicy::from_config(config),
    );
    orchestrator.verify_reference_solutions(problem).await?;
    for reference in &problem.reference_solution {
        println!("  ✅ {}", reference.language);
    }
    Ok(())
}

pub async fn add_problem(path: &str, creator: Uuid, verify: bool) -> Result<()> {
    println!("🚀 Adding problem from: {}", path);

    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let problem = problem_from_json(&raw, creator)?;
    let config = Config::from_env();
    let store = connect(&config).await?;

    let creator_user = store
        .get_user(creator)
        .await?
        .with_context(|| format!("Creator {} does not exist", creator))?;
    if creator_user.role != Role::Admin {
        bail!("Creator {} is not an admin", creator);
    }

    if verify {
        verify_references(&config, &store, &problem).await?;
    } else {
        println!("⚠️  Skipping reference verification");
    }

    store.put_problem(&problem).await?;

    println!("✅ Problem '{}' added successfully!", problem.title);
    println!("   id: {}", problem.id);
    println!(
        "   {} visible / {} hidden test case(s)",
        problem.visible_test_cases.len(),
        problem.hidden_test_cases.len()
    );
    Ok(())
}

pub async fn update_problem(path: &str, id: Uuid, verify: bool) -> Result<()> {
    println!("✏️  Updating problem {} from: {}", id, path);

    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let config = Config::from_env();
    let store = connect(&config).await?;

    let existing = store
        .get_problem(id)
        .await?
        .with_context(|| format!("Problem {} does not exist", id))?;
    let problem = replacement_problem(&raw, &existing)?;

    if verify {
        verify_references(&config, &store, &problem).await?;
    } else {
        println!("⚠️  Skipping reference verification");
    }

    store.put_problem(&problem).await?;

    println!("✅ Problem '{}' updated successfully!", problem.title);
    println!(
        "   {} visible / {} hidden test case(s)",
        problem.visible_test_cases.len(),
        problem.hidden_test_cases.len()
    );
    Ok(())
}

pub async fn add_user(
    first_name: &str,
    email: &str,
    last_name: Option<String>,
    admin: bool,
    google_id: Option<String>,
) -> Result<()> {
    let mut user = User::new(first_name, email);
    if user.first_name.trim().is_empty() || user.email_id.is_empty() {
        bail!("First name and email are required");
    }
    user.last_name = last_name;
    user.google_id = google_id;
    if admin {
        user.role = Role::Admin;
    }

    let config = Config::from_env();
    let store = connect(&config).await?;
    store.put_user(&user).await?;

    println!("✅ User '{}' registered", user.email_id);
    println!("   id: {}", user.id);
    println!("   role: {:?}", user.role);
    Ok(())
}

pub async fn list_problems() -> Result<()> {
    let config = Config::from_env();
    let store = connect(&config).await?;
    let problems = store.list_problems().await?;

    if problems.is_empty() {
        println!("No problems stored.");
        println!("\n💡 Add one with: arena-cli add-problem --file <problem.json> --creator <admin-id>");
        return Ok(());
    }

    println!("📋 Problems:\n");
    println!("{:<38} {:<10} {:<12} {}", "ID", "DIFFICULTY", "TAG", "TITLE");
    println!("{}", "─".repeat(90));
    for summary in &problems {
        println!(
            "{:<38} {:<10} {:<12} {}",
            summary.id.to_string(),
            format!("{:?}", summary.difficulty).to_lowercase(),
            format!("{:?}", summary.tag),
            summary.title
        );
    }
    println!("\n✅ Total: {} problem(s)", problems.len());
    Ok(())
}

pub fn list_languages() {
    println!("📋 Supported Languages:\n");
    println!("{:<12} {}", "LANGUAGE", "JUDGE0 ID");
    println!("{}", "─".repeat(24));
    for language in Language::all_variants() {
        println!("{:<12} {}", language.to_string(), language.judge0_id());
    }
}

pub async fn show_submissions(user_id: Uuid, problem_id: Uuid) -> Result<()> {
    let config = Config::from_env();
    let store = connect(&config).await?;
    let submissions = store.submissions_for(user_id, problem_id).await?;

    if submissions.is_empty() {
        println!("No submissions for user {} on problem {}", user_id, problem_id);
        return Ok(());
    }

    println!(
        "{:<38} {:<12} {:<10} {:<8} {:<10} {}",
        "ID", "LANGUAGE", "STATUS", "PASSED", "RUNTIME", "SUBMITTED"
    );
    println!("{}", "─".repeat(110));
    for s in &submissions {
        println!(
            "{:<38} {:<12} {:<10} {:<8} {:<10} {}",
            s.id.to_string(),
            s.language.to_string(),
            s.status.to_string(),
            format!("{}/{}", s.test_cases_passed, s.test_cases_total),
            format!("{:.3}s", s.runtime),
            s.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(message) = &s.error_message {
            println!("    ↳ {}", message.lines().next().unwrap_or_default());
        }
    }
    Ok(())
}
