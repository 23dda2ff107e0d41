//! Interface de terminal do execwatch: spinner de acompanhamento e tabelas.
//!
//! Usa `indicatif` para o spinner de progresso e `console` para estilização
//! com cores. O [`WatchProgress`] é o renderizador passado ao `watch` de uma
//! `JobList`.

use std::collections::BTreeMap;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use execwatch::progress::FepProgress;
use execwatch::{AggregateError, JobSummary, ProgressReport, Snapshot, Status, WatchUpdate};

/// Indicador visual de um `watch` em andamento.
///
/// Clonável: o clone vai para dentro do callback do watcher e o original fica
/// com o chamador para finalizar o spinner.
#[derive(Clone)]
pub struct WatchProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl WatchProgress {
    /// Inicia o spinner para `members` execuções.
    pub fn start(members: usize) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Watching {members} executions"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Renderiza um ciclo de polling.
    pub fn update(&self, update: &WatchUpdate) {
        let breakdown = self.styled_breakdown(&update.status_breakdown());
        self.pb
            .set_message(format!("cycle {}: {breakdown}", update.cycle));

        for snap in &update.snapshots {
            if let Some(line) = progress_line(snap) {
                self.pb.println(format!("  {} {line}", self.yellow.apply_to("·")));
            }
        }
        if let Some(failures) = &update.failures {
            for (id, err) in &failures.failed {
                self.pb
                    .println(format!("  {} {id}: {err}", self.yellow.apply_to("↻")));
            }
        }
    }

    /// Finaliza o spinner com o resumo final.
    pub fn finish(&self, breakdown: &BTreeMap<String, usize>, stopped: bool) {
        self.pb.finish_and_clear();
        let summary = self.styled_breakdown(breakdown);
        if stopped {
            println!("  {} Watch stopped: {summary}", self.yellow.apply_to("■"));
        } else {
            println!("  {} All executions finished: {summary}", self.green.apply_to("✓"));
        }
    }

    fn styled_breakdown(&self, breakdown: &BTreeMap<String, usize>) -> String {
        if breakdown.is_empty() {
            return "no executions".to_string();
        }
        breakdown
            .iter()
            .map(|(status, count)| {
                let text = format!("{status}={count}");
                match Status::from(status.as_str()) {
                    Status::Succeeded => self.green.apply_to(text).to_string(),
                    Status::Failed | Status::Cancelled => self.red.apply_to(text).to_string(),
                    _ => text,
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resumo de uma linha do relatório de progresso da execução, se houver.
fn progress_line(snap: &Snapshot) -> Option<String> {
    if snap.is_terminal() {
        return None;
    }
    match snap.progress() {
        ProgressReport::Docking(docking) => Some(match docking.total {
            Some(total) => format!("{}: docked {}/{total}", snap.id, docking.docked),
            None => format!("{}: docked {}", snap.id, docking.docked),
        }),
        ProgressReport::Fep(FepProgress::Stage {
            cmd,
            sub_step,
            current_step,
            target_step,
        }) => {
            let mut line = format!("{}: {cmd}", snap.id);
            if let Some(sub_step) = sub_step {
                line.push_str(&format!(" / {sub_step}"));
            }
            if let (Some(current), Some(target)) = (current_step, target_step) {
                line.push_str(&format!(" ({current:.0}/{target:.0})"));
            }
            Some(line)
        }
        ProgressReport::Fep(FepProgress::Results { delta_g, unit }) => Some(match delta_g {
            Some(delta_g) => format!("{}: ΔG = {delta_g:.2} {unit}", snap.id),
            None => format!("{}: results ready", snap.id),
        }),
        ProgressReport::Empty | ProgressReport::Opaque(_) => None,
    }
}

/// Imprime as linhas como tabela alinhada.
pub fn print_table(rows: &[JobSummary]) {
    let header = Style::new().bold();
    println!(
        "{}",
        header.apply_to(format!(
            "{:<38} {:<10} {:<32} {:>8} {:>10}",
            "ID", "STATUS", "TOOL", "MINUTES", "AMOUNT"
        ))
    );
    for row in rows {
        let tool = match (&row.tool_key, &row.tool_version) {
            (Some(key), Some(version)) => format!("{key}@{version}"),
            (Some(key), None) => key.clone(),
            _ => "-".to_string(),
        };
        println!(
            "{:<38} {:<10} {:<32} {:>8} {:>10}",
            row.id,
            row.status
                .as_ref()
                .map(Status::to_string)
                .unwrap_or_else(|| "?".to_string()),
            tool,
            row.run_minutes.map(|m| m.to_string()).unwrap_or_default(),
            row.approve_amount.map(|a| a.to_string()).unwrap_or_default(),
        );
    }
}

/// Imprime as linhas como JSON formatado.
pub fn print_json(rows: &[JobSummary]) {
    println!("{}", serde_json::to_string_pretty(rows).unwrap_or_default());
}

/// Lista os membros que falharam em uma operação em lote.
pub fn print_failures(action: &str, failures: &AggregateError) {
    let red = Style::new().red().bold();
    eprintln!(
        "  {} {action}: {} of {} failed",
        red.apply_to("✗"),
        failures.failed.len(),
        failures.failed.len() + failures.succeeded.len()
    );
    for (id, err) in &failures.failed {
        eprintln!("    {id}: {err}");
    }
}
