use anyhow::{bail, Context, Result};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::info;

use super::args::{Commands, OutputFormat, RepoCommands, RequestArgs};
use super::local::read_local_folder;
use super::render;
use crate::agents::{
    build_preview, execute_plan, explain_response_prompt, file_assist_prompt, finder_prompt,
    parse_agent_reply, parse_found_apis, AgentReply,
};
use crate::app::{init_config, Config};
use crate::constants::HEADER_COMMENT_MARKER;
use crate::github::{
    default_put_message, gather_context, open_file, put_file, remove_file, upload_folder, FileSet,
    GitHubClient, RepositoryContents,
};
use crate::http::{
    KeyValueList, KeyValuePair, ProxySetting, RequestDescriptor, RequestExecutor, ReqwestTransport,
    ResponseRecord,
};
use crate::models::{api_key_from_env, ChatSession, GeminiModel, Model};
use crate::runtime::RepoAgent;
use crate::utils::{ErrorRecord, ProbeError};

/// Run one command; `Ok(false)` means it finished but should exit non-zero
pub async fn handle_command(command: Commands, config: &Config) -> Result<bool> {
    match command {
        Commands::Send(args) => {
            let format = args.format;
            Ok(send_and_print(&build_descriptor(&args, config)?, config, format)
                .await?
                .is_some())
        }
        Commands::Find {
            query,
            send,
            format,
        } => find(&query, send, format, config).await,
        Commands::Explain { request, question } => {
            let descriptor = build_descriptor(&request, config)?;
            match send_and_print(&descriptor, config, request.format).await? {
                Some(record) => {
                    explain(&record, question.as_deref(), config).await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        Commands::Repo { command } => handle_repo(command, config).await,
        Commands::Init => {
            println!("Initializing apiprobe configuration...");
            for path in init_config()? {
                println!("Created {}", path.display());
            }
            println!("Configuration initialized successfully!");
            Ok(true)
        }
    }
}

/// Descriptor from flags, starting from the configured headers and proxy
fn build_descriptor(args: &RequestArgs, config: &Config) -> Result<RequestDescriptor> {
    let mut descriptor = RequestDescriptor::new(args.method, args.url.clone());

    let mut headers = config.default_headers();
    for line in &args.headers {
        let pair = KeyValuePair::parse_line(0, line).ok_or_else(|| {
            ProbeError::InvalidInput(format!("header must look like 'Key: Value', got '{}'", line))
        })?;
        match headers.id_of(&pair.key) {
            Some(id) => {
                headers.update_value(id, pair.value);
            }
            None => {
                headers.add(pair.key, pair.value);
            }
        }
    }
    for key in &args.disabled_headers {
        let id = header_id(&headers, key)?;
        let current = headers
            .pairs()
            .iter()
            .find(|pair| pair.id == id)
            .map(|pair| pair.key.clone())
            .unwrap_or_default();
        headers.update_key(id, format!("{}{}", HEADER_COMMENT_MARKER, current));
    }
    for key in &args.removed_headers {
        let id = header_id(&headers, key)?;
        headers.remove(id);
    }
    descriptor.headers = headers.into_pairs();

    if let Some(body) = &args.body {
        descriptor.body = body.clone();
    } else if let Some(path) = &args.body_file {
        descriptor.body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read body from {}", path.display()))?;
    }

    descriptor.proxy = match &args.proxy {
        Some(raw) => raw.parse::<ProxySetting>().map_err(ProbeError::InvalidInput)?,
        None => config.http.default_proxy.clone(),
    };

    Ok(descriptor)
}

fn header_id(headers: &KeyValueList, key: &str) -> Result<u64, ProbeError> {
    headers
        .id_of(key.trim())
        .ok_or_else(|| ProbeError::InvalidInput(format!("there is no header named '{}'", key.trim())))
}

/// Send and print; a failed request is printed as an error record
async fn send_and_print(
    descriptor: &RequestDescriptor,
    config: &Config,
    format: OutputFormat,
) -> Result<Option<ResponseRecord>> {
    let executor = RequestExecutor::new(ReqwestTransport::new(config.timeout())?);
    match executor.send(descriptor).await {
        Ok(record) => {
            println!("{}", render::render_response(&record, format));
            Ok(Some(record))
        }
        Err(e) => {
            eprintln!("{}", render::render_error(&ErrorRecord::from(&e), format));
            Ok(None)
        }
    }
}

fn build_model(config: &Config) -> Result<Box<dyn Model>> {
    if config.model.provider != "gemini" {
        bail!("unsupported model provider '{}'", config.model.provider);
    }
    let api_key = api_key_from_env(&config.model.api_key_env)?;
    Ok(Box::new(GeminiModel::new(
        config.model.api_base.clone(),
        config.model.name.clone(),
        api_key,
    )?))
}

async fn find(query: &str, send: Option<usize>, format: OutputFormat, config: &Config) -> Result<bool> {
    if query.trim().is_empty() {
        bail!("Please describe the API you want to find.");
    }

    let mut session = ChatSession::new(build_model(config)?, config.generation_config());
    let reply = session.send(&finder_prompt(query.trim())).await?.content.clone();
    let apis = parse_found_apis(&reply)?;
    println!("{}", render::render_found_apis(&apis, format));

    let Some(index) = send else {
        return Ok(true);
    };
    let api = index
        .checked_sub(1)
        .and_then(|i| apis.get(i))
        .with_context(|| format!("there is no result number {}", index))?;

    let mut descriptor = api.to_descriptor();
    descriptor.proxy = config.http.default_proxy.clone();
    Ok(send_and_print(&descriptor, config, format).await?.is_some())
}

async fn explain(record: &ResponseRecord, question: Option<&str>, config: &Config) -> Result<()> {
    let mut session = ChatSession::new(build_model(config)?, config.generation_config());
    let reply = session
        .send(&explain_response_prompt(record, question))
        .await?;
    println!("\n{}\n{}", "Explanation:".bold(), render::render_message(reply));
    Ok(())
}

fn github_client(config: &Config) -> Result<GitHubClient> {
    Ok(GitHubClient::new(
        config.github.api_base.clone(),
        config.github_token()?,
    )?)
}

/// Resolve a repository into a content store and its current file listing
async fn open_repo(config: &Config, repo: &str) -> Result<(RepositoryContents, FileSet)> {
    let client = github_client(config)?;
    let snapshot = client.fetch_repository(repo).await?;
    Ok((client.contents(snapshot.info), snapshot.files))
}

fn is_yes(answer: Option<&str>) -> bool {
    matches!(answer.map(str::trim), Some("y" | "Y" | "yes"))
}

async fn confirm(question: &str) -> Result<bool> {
    println!("{}", question);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    Ok(is_yes(lines.next_line().await?.as_deref()))
}

async fn handle_repo(command: RepoCommands, config: &Config) -> Result<bool> {
    match command {
        RepoCommands::List => {
            let repos = github_client(config)?.list_repositories().await?;
            println!("{}", render::render_repositories(&repos));
            Ok(true)
        }
        RepoCommands::Files { repo } => {
            let snapshot = github_client(config)?.fetch_repository(&repo).await?;
            print!("{}", render::render_snapshot(&snapshot));
            Ok(true)
        }
        RepoCommands::Plan {
            repo,
            plan,
            dry_run,
        } => run_plan_file(&repo, &plan, dry_run, config).await,
        RepoCommands::Agent { repo, yes } => run_agent(&repo, yes, config).await,
        RepoCommands::Context { repo, path } => {
            let (store, files) = open_repo(config, &repo).await?;
            let current = open_file(&store, &files, &path).await?.decode_text()?;
            let context = gather_context(
                &store,
                &files,
                Some((path.as_str(), current.as_str())),
                config.prefetch_options(),
            )
            .await;
            println!(
                "{}",
                file_assist_prompt(&store.repo().path, &path, &files, &context)
            );
            Ok(true)
        }
        RepoCommands::Ask { repo, path } => run_file_chat(&repo, &path, config).await,
        RepoCommands::Show { repo, path } => {
            let (store, files) = open_repo(config, &repo).await?;
            let file = open_file(&store, &files, &path).await?;
            eprintln!(
                "{}",
                format!("{} @ {} ({})", path, store.repo().path, file.revision).dimmed()
            );
            print!("{}", file.decode_text()?);
            Ok(true)
        }
        RepoCommands::Put {
            repo,
            path,
            file,
            message,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let (store, mut files) = open_repo(config, &repo).await?;
            let message = message.unwrap_or_else(|| default_put_message(&files, &path));

            let identity = put_file(&store, &mut files, &path, &bytes, &message).await?;
            println!("{} {} in {}", "Saved".green(), identity.path, store.repo().path);
            Ok(true)
        }
        RepoCommands::Upload {
            repo,
            dir,
            to,
            message,
            all,
        } => {
            let local = read_local_folder(&dir, all)?;
            if local.is_empty() {
                bail!("{} has no files to upload", dir.display());
            }
            let (store, mut files) = open_repo(config, &repo).await?;

            match upload_folder(&store, &mut files, &to, &local, &message).await {
                Ok(uploaded) => {
                    println!(
                        "{} {} file(s) to {}",
                        "Uploaded".green(),
                        uploaded.len(),
                        store.repo().path
                    );
                    Ok(true)
                }
                Err(failure) => {
                    let record = ErrorRecord {
                        message: failure.to_string(),
                    };
                    eprintln!("{}", render::render_error(&record, OutputFormat::Text));
                    Ok(false)
                }
            }
        }
        RepoCommands::Rm { repo, path, yes } => {
            let (store, mut files) = open_repo(config, &repo).await?;
            if !files.contains(&path) {
                return Err(ProbeError::NotFound(path).into());
            }
            let question = format!("Delete {} from {}? [y/N]", path, store.repo().path);
            if !yes && !confirm(&question).await? {
                println!("Nothing deleted.");
                return Ok(true);
            }

            remove_file(&store, &mut files, &path).await?;
            println!("{} {}", "Deleted".green(), path);
            Ok(true)
        }
        RepoCommands::Build { repo, output } => {
            let (store, files) = open_repo(config, &repo).await?;
            let model = build_model(config)?;
            let html = build_preview(model.as_ref(), &store, &files, config.model.temperature).await?;

            tokio::fs::write(&output, &html)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Preview of {} written to {}; open it in a browser.",
                store.repo().path,
                output.display()
            );
            Ok(true)
        }
        RepoCommands::Create {
            name,
            description,
            private,
        } => {
            let created = github_client(config)?
                .create_repository(&name, &description, private)
                .await?;
            println!("Created {}", created.full_name.green());
            Ok(true)
        }
    }
}

async fn run_plan_file(repo: &str, source: &str, dry_run: bool, config: &Config) -> Result<bool> {
    let text = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read plan from {}", source))?
    };

    let plan = match parse_agent_reply(&text)? {
        AgentReply::Plan(plan) => plan,
        AgentReply::EmptyPlan => {
            println!("The plan is empty, nothing to do.");
            return Ok(true);
        }
        AgentReply::Conversation(_) => bail!("{} does not contain a JSON action plan", source),
    };

    print!("{}", render::render_plan(&plan));
    if dry_run {
        return Ok(true);
    }

    let (store, mut files) = open_repo(config, repo).await?;
    match execute_plan(&store, &plan, &mut files, &config.github.commit_prefix).await {
        Ok(report) => {
            println!("{}", render::render_report(&report, OutputFormat::Text));
            Ok(true)
        }
        Err(failure) => {
            eprintln!("{}", render::render_failure(&failure, OutputFormat::Text));
            Ok(false)
        }
    }
}

async fn run_file_chat(repo: &str, path: &str, config: &Config) -> Result<bool> {
    let (store, files) = open_repo(config, repo).await?;
    let current = open_file(&store, &files, path).await?.decode_text()?;
    let context = gather_context(
        &store,
        &files,
        Some((path, current.as_str())),
        config.prefetch_options(),
    )
    .await;

    let mut session = ChatSession::new(build_model(config)?, config.generation_config());
    println!(
        "Asking {} about {} in {}. Type 'exit' to quit.",
        session.model_name().bold(),
        path.bold(),
        store.repo().path
    );
    let opening = session
        .send(&file_assist_prompt(&store.repo().path, path, &files, &context))
        .await?;
    println!("\n{}\n", render::render_message(opening));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }
        match session.send(input).await {
            Ok(reply) => println!("\n{}\n", render::render_message(reply)),
            Err(e) => eprintln!("{}", render::render_error(&ErrorRecord::from(&e), OutputFormat::Text)),
        }
    }

    Ok(true)
}

async fn run_agent(repo: &str, auto_approve: bool, config: &Config) -> Result<bool> {
    let (store, files) = open_repo(config, repo).await?;
    let repo_path = store.repo().path.clone();

    let mut agent = RepoAgent::new(
        build_model(config)?,
        config.generation_config(),
        store,
        &repo_path,
        files,
        config.github.commit_prefix.clone(),
    );
    info!("agent ready for {}", repo_path);
    println!(
        "Chatting about {} ({} files). Type 'exit' to quit.",
        repo_path.bold(),
        agent.files().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut all_ok = true;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        let turn = match agent.send(input).await {
            Ok(turn) => turn,
            Err(e) => {
                eprintln!("{}", render::render_error(&ErrorRecord::from(&e), OutputFormat::Text));
                continue;
            }
        };

        match turn.reply {
            AgentReply::Conversation(_) => println!("\n{}\n", render::render_message(&turn.message)),
            AgentReply::EmptyPlan => {
                println!("\nI could not build a plan for that request. Try describing it differently.\n")
            }
            AgentReply::Plan(plan) => {
                print!("\n{}", render::render_plan(&plan));
                let approved = auto_approve || {
                    println!("Execute this plan? [y/N]");
                    is_yes(lines.next_line().await?.as_deref())
                };
                if !approved {
                    agent.discard_plan();
                    println!("Plan discarded.\n");
                    continue;
                }
                match agent.execute_pending().await {
                    Ok(report) => println!("{}\n", render::render_report(&report, OutputFormat::Text)),
                    Err(failure) => {
                        all_ok = false;
                        eprintln!("{}\n", render::render_failure(&failure, OutputFormat::Text));
                    }
                }
            }
        }
    }

    Ok(all_ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use pretty_assertions::assert_eq;

    fn args(headers: &[&str]) -> RequestArgs {
        RequestArgs {
            url: "api.example.com".to_string(),
            method: HttpMethod::Get,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            disabled_headers: Vec::new(),
            removed_headers: Vec::new(),
            body: None,
            body_file: None,
            proxy: Some("cors-anywhere".to_string()),
            format: OutputFormat::Text,
        }
    }

    fn rows(descriptor: &RequestDescriptor) -> Vec<(String, String)> {
        descriptor
            .headers
            .iter()
            .map(|h| (h.key.clone(), h.value.clone()))
            .collect()
    }

    #[test]
    fn test_descriptor_uses_config_headers_by_default() {
        let descriptor = build_descriptor(&args(&[]), &Config::default()).unwrap();
        assert_eq!(
            rows(&descriptor),
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(descriptor.proxy, ProxySetting::CorsAnywhere);
    }

    #[test]
    fn test_flag_headers_merge_with_config() {
        let descriptor = build_descriptor(
            &args(&["content-type: text/plain", "Accept: */*", "//X-Off: 1"]),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(
            rows(&descriptor),
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
                ("//X-Off".to_string(), "1".to_string()),
            ]
        );
        assert!(!descriptor.headers[2].is_active());
    }

    #[test]
    fn test_disable_and_remove_headers() {
        let mut request = args(&["Accept: */*"]);
        request.disabled_headers = vec!["content-type".to_string()];
        request.removed_headers = vec!["Accept".to_string()];

        let descriptor = build_descriptor(&request, &Config::default()).unwrap();
        assert_eq!(
            rows(&descriptor),
            vec![("//Content-Type".to_string(), "application/json".to_string())]
        );
        assert!(!descriptor.headers[0].is_active());

        let mut request = args(&[]);
        request.removed_headers = vec!["X-Missing".to_string()];
        assert!(build_descriptor(&request, &Config::default()).is_err());
    }

    #[test]
    fn test_descriptor_rejects_bad_header() {
        assert!(build_descriptor(&args(&["no separator"]), &Config::default()).is_err());
    }

    #[test]
    fn test_body_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, "{\"a\": 1}").unwrap();

        let mut request = args(&[]);
        request.method = HttpMethod::Post;
        request.body_file = Some(path);
        let descriptor = build_descriptor(&request, &Config::default()).unwrap();
        assert_eq!(descriptor.body, "{\"a\": 1}");
    }

    #[test]
    fn test_confirmation_answers() {
        assert!(is_yes(Some(" y ")));
        assert!(is_yes(Some("yes")));
        assert!(!is_yes(Some("no")));
        assert!(!is_yes(Some("")));
        assert!(!is_yes(None));
    }
}
