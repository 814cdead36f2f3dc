//! Presentation collaborator
//!
//! The core hands plain data to a `Presenter`. The console presenter prints
//! the wallet line, the supply counter and the button label.

use std::time::Duration;

use crate::types::{GateState, Notification, SaleView, Severity};

pub trait Presenter: Send + Sync {
    fn render(&self, view: &SaleView);
    fn notify(&self, notification: &Notification);
}

/// `H hours, M minutes, S seconds`, days folded into hours
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{} hours, {} minutes, {} seconds", hours, minutes, seconds)
}

/// Label of the mint button for a view
pub fn button_label(view: &SaleView) -> String {
    match view.gate {
        GateState::SoldOut => "SOLD OUT".to_string(),
        GateState::Active => "MINT".to_string(),
        GateState::Submitting => "MINTING...".to_string(),
        GateState::WaitingForStart => match view.countdown {
            Some(remaining) => format_countdown(remaining),
            None => "NOT LIVE".to_string(),
        },
    }
}

/// Lines a view renders to, top to bottom
pub fn render_lines(view: &SaleView) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);
    match &view.wallet {
        Some(wallet) => lines.push(format!("{} : {} SOL", wallet, view.balance_sol.unwrap_or(0.0))),
        None => lines.push("Connect Wallet".to_string()),
    }
    if let Some(sale) = &view.sale {
        lines.push(format!(
            "Available: {} / {}",
            sale.items_available, sale.items_remaining
        ));
    }
    lines.push(format!("[ {} ]", button_label(view)));
    if let Some(err) = &view.last_fetch_error {
        lines.push(format!("(state refresh failed: {})", err));
    }
    lines
}

/// Prints to stdout
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn render(&self, view: &SaleView) {
        for line in render_lines(view) {
            println!("{}", line);
        }
    }

    fn notify(&self, notification: &Notification) {
        let tag = match notification.severity {
            Severity::Success => "SUCCESS",
            Severity::Error => "ERROR",
        };
        match &notification.detail {
            Some(detail) => println!("[{}] {} ({})", tag, notification.message, detail),
            None => println!("[{}] {}", tag, notification.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleState;

    fn view(gate: GateState) -> SaleView {
        SaleView {
            gate,
            sale: Some(SaleState::new(100, 40, None, 1)),
            balance_sol: Some(1.25),
            wallet: Some("9xQe...VFin".to_string()),
            countdown: None,
            last_fetch_error: None,
        }
    }

    #[test]
    fn test_countdown_folds_days_into_hours() {
        let remaining = Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5);
        assert_eq!(format_countdown(remaining), "51 hours, 4 minutes, 5 seconds");
    }

    #[test]
    fn test_button_labels() {
        assert_eq!(button_label(&view(GateState::SoldOut)), "SOLD OUT");
        assert_eq!(button_label(&view(GateState::Active)), "MINT");
        assert_eq!(button_label(&view(GateState::Submitting)), "MINTING...");

        let mut waiting = view(GateState::WaitingForStart);
        waiting.countdown = Some(Duration::from_secs(61));
        assert_eq!(button_label(&waiting), "0 hours, 1 minutes, 1 seconds");
    }

    #[test]
    fn test_render_lines() {
        let lines = render_lines(&view(GateState::Active));
        assert_eq!(lines[0], "9xQe...VFin : 1.25 SOL");
        assert_eq!(lines[1], "Available: 100 / 60");
        assert_eq!(lines[2], "[ MINT ]");
    }

    #[test]
    fn test_render_without_wallet() {
        let mut v = view(GateState::WaitingForStart);
        v.wallet = None;
        v.sale = None;
        v.last_fetch_error = Some("ledger unreachable".to_string());
        let lines = render_lines(&v);
        assert_eq!(lines[0], "Connect Wallet");
        assert_eq!(lines[1], "[ NOT LIVE ]");
        assert!(lines[2].contains("ledger unreachable"));
    }
}
