// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// CLI para execução do pipeline de pesquisa.
//
// Uso:
//   research-cli "Mieterverein Berlin Kontakt"
//   research-cli --initial "Mieterverein" --urls 5 "Hilfe für Mieter in Berlin"
//   research-cli --rank-websites --json "objetivo"
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use research_pipeline::fetcher::HttpFetcher;
use research_pipeline::llm::HttpLlmClient;
use research_pipeline::search::GoogleSearchClient;
use research_pipeline::{load_research_config, ResearchOrchestrator, ResearchReport, ResearchRequest};
use std::path::PathBuf;
use std::sync::Arc;

/// Opções de linha de comando
#[derive(Debug, Default)]
struct CliOptions {
    initial_query: Option<String>,
    max_results: Option<usize>,
    urls_to_analyze: Option<usize>,
    rank_websites: bool,
    json: bool,
    objective: String,
}

/// Tenta carregar o arquivo .env de múltiplos locais possíveis
fn load_dotenv() {
    let possible_paths = [PathBuf::from(".env"), PathBuf::from("../.env")];

    for path in &possible_paths {
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => {
                    eprintln!(
                        "✓ Carregado .env de: {:?}",
                        path.canonicalize().unwrap_or(path.clone())
                    );
                    return;
                }
                Err(e) => {
                    eprintln!("⚠ Erro ao carregar {:?}: {}", path, e);
                }
            }
        }
    }

    eprintln!("⚠ Nenhum arquivo .env encontrado. Usando apenas variáveis de ambiente.");
}

fn print_usage(program: &str) {
    eprintln!("Research CLI v{}", research_pipeline::VERSION);
    eprintln!();
    eprintln!("Uso: {} [opções] <objetivo>", program);
    eprintln!();
    eprintln!("Opções:");
    eprintln!("  --initial <query>    Query inicial (padrão: o objetivo)");
    eprintln!("  --max-results <n>    Trunca a lista ranqueada em n resultados");
    eprintln!("  --urls <k>           URLs analisadas em detalhe (padrão: 3)");
    eprintln!("  --rank-websites      Ranqueia os sites analisados por importância");
    eprintln!("  --json               Imprime o relatório em JSON");
    eprintln!();
    eprintln!("Exemplos:");
    eprintln!("  {} \"Mieterverein Berlin Kontakt\"", program);
    eprintln!("  {} --initial \"Mieterverein\" --urls 5 \"Hilfe für Mieter\"", program);
}

fn parse_count(flag: &str, value: Option<&String>) -> anyhow::Result<usize> {
    let value = value.ok_or_else(|| anyhow::anyhow!("{} requer um valor", flag))?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => anyhow::bail!("{} requer um inteiro positivo, recebido '{}'", flag, value),
    }
}

fn parse_args(args: &[String]) -> anyhow::Result<CliOptions> {
    let mut options = CliOptions::default();
    let mut words = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--initial" => {
                let query = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--initial requer um valor"))?;
                options.initial_query = Some(query.clone());
            }
            "--max-results" => options.max_results = Some(parse_count(arg, iter.next())?),
            "--urls" => options.urls_to_analyze = Some(parse_count(arg, iter.next())?),
            "--rank-websites" => options.rank_websites = true,
            "--json" => options.json = true,
            _ => words.push(arg.clone()),
        }
    }

    options.objective = words.join(" ").trim().to_string();
    if options.objective.is_empty() {
        anyhow::bail!("objetivo de pesquisa vazio");
    }

    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Carregar .env PRIMEIRO, antes de qualquer coisa
    load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("research-cli");

    let options = match parse_args(args.get(1..).unwrap_or(&[])) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("✗ Erro: {}", e);
            eprintln!();
            print_usage(program);
            std::process::exit(1);
        }
    };

    let mut config = load_research_config();
    if let Some(max) = options.max_results {
        config.limits.max_ranked_results = Some(max);
    }
    if let Some(urls) = options.urls_to_analyze {
        config.limits.urls_to_analyze = urls;
    }
    if options.rank_websites {
        config.rank_websites = true;
    }

    if !config.credentials.has_search() {
        eprintln!("✗ Erro: GOOGLE_API_KEY e GOOGLE_CSE_ID não encontradas!");
        eprintln!();
        eprintln!("Defina as variáveis no .env ou no ambiente:");
        eprintln!("  export GOOGLE_API_KEY=sua-chave-aqui");
        eprintln!("  export GOOGLE_CSE_ID=seu-engine-id");
        std::process::exit(1);
    }

    let search = GoogleSearchClient::from_config(&config)?;
    let orchestrator = ResearchOrchestrator::new(
        config.clone(),
        Arc::new(HttpLlmClient::new(&config)),
        Arc::new(search),
        Arc::new(HttpFetcher::new(&config)),
    );

    let mut request = ResearchRequest::new(options.objective.clone());
    if let Some(initial) = options.initial_query {
        request = request.with_initial_query(initial);
    }

    if !options.json {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!(" RESEARCH PIPELINE v{}", research_pipeline::VERSION);
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();
        println!("Objetivo: {}", request.objective);
        println!("Query inicial: {}", request.initial_query());
        println!();
    }

    let report = orchestrator.research(&request).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        std::process::exit(2);
    }

    Ok(())
}

fn print_report(report: &ResearchReport) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(" RESULTADO");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(error) = &report.error {
        println!("✗ Pesquisa falhou: {}", error);
        println!();
    }

    println!("Queries usadas:");
    for query in &report.queries_used {
        println!("  - {}", query);
    }
    println!();

    println!("Resultados ranqueados ({}):", report.total_results);
    for (i, result) in report.all_ranked_results.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, result.relevance_tier, result.title());
        println!("     {}", result.url());
    }
    println!();

    for analysis in &report.analyzed_results {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!(" {}", analysis.title);
        println!(" {}", analysis.url);
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if let Some(error) = &analysis.error {
            println!("⚠️  {}", error);
        }
        println!("Relevância: {}", analysis.relevance_rating);
        if !analysis.relevance_explanation.is_empty() {
            println!("  {}", analysis.relevance_explanation);
        }
        if !analysis.summary.is_empty() {
            println!();
            println!("{}", analysis.summary);
        }

        let contacts = &analysis.contact_info;
        if !contacts.is_empty() {
            println!();
            println!("Contatos:");
            for email in &contacts.emails {
                println!("  ✉️  {}", email);
            }
            for phone in &contacts.phones {
                println!("  📞 {}", phone);
            }
            for profile in &contacts.social_media {
                println!("  🔗 {}", profile);
            }
            for address in &contacts.addresses {
                println!("  📍 {}", address);
            }
        }

        if !analysis.next_actions.is_empty() {
            println!();
            println!("Próximas ações:");
            for action in &analysis.next_actions {
                println!("  - {}", action);
            }
        }
        println!();
    }

    if !report.ranked_websites.is_empty() {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!(" SITES POR IMPORTÂNCIA");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();
        for (i, site) in report.ranked_websites.iter().enumerate() {
            println!("  {}. [{}] {} - {}", i + 1, site.importance, site.title, site.url);
        }
        println!();
    }

    println!("⏱️  Tempo total: {:.2}s", report.elapsed_ms as f64 / 1000.0);
    println!("    {}", report.stage_timings.summary());
}
