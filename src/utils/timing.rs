// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIMING UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Medição de tempo dos estágios de uma pesquisa.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timer de um estágio
pub struct StageTimer {
    start: Instant,
    stage: String,
}

impl StageTimer {
    /// Inicia o timer de um estágio
    pub fn start(stage: &str) -> Self {
        Self {
            start: Instant::now(),
            stage: stage.to_string(),
        }
    }

    /// Tempo decorrido em milissegundos
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Para o timer, loga e registra em `timings`
    pub fn stop_into(self, timings: &mut StageTimings) -> u128 {
        let elapsed = self.elapsed_ms();
        log::info!("⏱️  {} completado em {}ms", self.stage, elapsed);
        timings.record(&self.stage, elapsed);
        elapsed
    }
}

/// Tempos acumulados por estágio, na ordem de execução
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    entries: Vec<(String, u128)>,
}

impl StageTimings {
    /// Sem estágios registrados
    pub fn new() -> Self {
        Self::default()
    }

    /// Soma `ms` ao estágio (cria se ainda não existe)
    pub fn record(&mut self, stage: &str, ms: u128) {
        match self.entries.iter_mut().find(|(s, _)| s == stage) {
            Some((_, total)) => *total += ms,
            None => self.entries.push((stage.to_string(), ms)),
        }
    }

    /// Tempo de um estágio
    pub fn get(&self, stage: &str) -> Option<u128> {
        self.entries.iter().find(|(s, _)| s == stage).map(|(_, ms)| *ms)
    }

    /// Resumo em uma linha (`stage=ms | ...`)
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(stage, ms)| format!("{}={}ms", stage, ms))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
