//! Command execution against the backend.

use std::sync::Arc;

use anganwadi_core::api::{ApiClient, HistoryQuery};
use anganwadi_core::attendance::{AttendanceMutator, AttendanceResolver, AttendanceView, MarkOutcome};
use anganwadi_core::export::{file_name, ExportFormat};
use anganwadi_core::models::{AttendanceRecord, AttendanceStatus, DetailsPatch, VaccinationStatus};
use anganwadi_core::utils::{format_date, format_optional, truncate_string, yes_no};
use anganwadi_core::vaccination::{VaccinationScheduler, VaccinationService};
use anganwadi_core::Config;
use anyhow::{Context as _, Result};
use chrono::Local;
use tracing::{debug, info};

/// Max width of the name column
const NAME_WIDTH: usize = 24;

pub struct Context {
    pub config: Config,
    resolver: AttendanceResolver,
    mutator: AttendanceMutator,
    vaccination: VaccinationService,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let mut client = ApiClient::new(config.api_base_url())
            .with_context(|| format!("Invalid API URL {}", config.api_base_url()))?;
        if let Some(token) = config.token() {
            client.set_token(token.to_string());
        }
        let client = Arc::new(client);

        let resolver = AttendanceResolver::new(client.clone(), config.center_aliases.clone());
        let mutator = AttendanceMutator::new(resolver.clone());
        let vaccination = VaccinationService::new(client);
        Ok(Self {
            config,
            resolver,
            mutator,
            vaccination,
        })
    }

    fn center<'a>(&'a self, center: &'a Option<String>) -> &'a str {
        center.as_deref().unwrap_or_else(|| self.config.center())
    }

    /// Resolve today's roster into a fresh view.
    async fn load_view(&self, center: &str) -> Result<AttendanceView> {
        let mut view = AttendanceView::new(center, Local::now().date_naive());
        self.resolver
            .reload(&mut view)
            .await
            .with_context(|| format!("Could not load attendance for {}", center))?;
        Ok(view)
    }

    // ===== Attendance =====

    pub async fn roster(
        &self,
        center: &Option<String>,
        status: Option<AttendanceStatus>,
        search: Option<&str>,
    ) -> Result<()> {
        let view = self.load_view(self.center(center)).await?;
        print_header(&view);

        if view.no_children_registered() {
            println!("No children registered at this center.");
            return Ok(());
        }

        let mut records: Vec<&AttendanceRecord> = match search {
            Some(query) => view.roster().search(query),
            None => view.roster().records.iter().collect(),
        };
        if let Some(status) = status {
            records.retain(|r| r.status == status);
        }
        for record in records {
            print_record(record);
        }
        Ok(())
    }

    pub async fn mark(&self, child_id: &str, status: AttendanceStatus) -> Result<()> {
        let mut view = self.load_view(self.config.center()).await?;
        let outcome = self.mutator.mark_one(&mut view, child_id, status).await?;
        debug!(?outcome, "Mark settled");
        if outcome == MarkOutcome::Confirmed {
            if let Some(record) = view.record(child_id) {
                print_record(record);
            }
        }
        print_summary(&view);
        Ok(())
    }

    pub async fn bulk(&self, status: AttendanceStatus, child_ids: Vec<String>) -> Result<()> {
        let mut view = self.load_view(self.config.center()).await?;
        let ids = if child_ids.is_empty() { None } else { Some(child_ids) };
        self.mutator.mark_bulk(&mut view, status, ids).await?;
        print_summary(&view);
        Ok(())
    }

    pub async fn details(&self, child_id: &str, patch: DetailsPatch) -> Result<()> {
        let mut view = self.load_view(self.config.center()).await?;
        self.mutator.patch_details(&mut view, child_id, patch).await?;
        if let Some(record) = view.record(child_id) {
            print_record(record);
        }
        Ok(())
    }

    pub async fn history(&self, child_id: &str, query: HistoryQuery) -> Result<()> {
        let entries = self.resolver.history(child_id, &query).await?;
        if entries.is_empty() {
            println!("No attendance history for {}.", child_id);
        }
        for entry in entries {
            println!(
                "{:<12} {:<9} in {:<5} out {:<5} nutrition {:<3} health {}",
                format_date(entry.date),
                entry.status.as_str(),
                format_optional(&entry.time_in, "-"),
                format_optional(&entry.time_out, "-"),
                yes_no(entry.nutrition_received),
                yes_no(entry.health_check_done),
            );
        }
        Ok(())
    }

    pub async fn stats(
        &self,
        center: &Option<String>,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
    ) -> Result<()> {
        let center = self.center(center);
        let stats = self.resolver.statistics(center, from, to).await?;
        println!("{}", center);
        println!("  Days:     {}", stats.total_days);
        println!("  Records:  {}", stats.total_records);
        println!(
            "  Present {}  Absent {}  Late {}  Sick {}  Half day {}",
            stats.present, stats.absent, stats.late, stats.sick, stats.half_day
        );
        println!("  Rate:     {:.1}%", stats.attendance_rate);
        Ok(())
    }

    // ===== Vaccination =====

    pub async fn vaccines(&self, center: &Option<String>, include_scheduled: bool) -> Result<()> {
        let center = self.center(center);
        let scheduler = VaccinationScheduler::for_today();
        let list = self
            .vaccination
            .due_list(Some(center), &scheduler)
            .await
            .with_context(|| format!("Could not load vaccination data for {}", center))?;

        println!(
            "{}: {} overdue, {} due, {} scheduled",
            center, list.counts.overdue, list.counts.due, list.counts.scheduled
        );
        for entry in list
            .entries
            .iter()
            .filter(|e| include_scheduled || e.status != VaccinationStatus::Scheduled)
        {
            println!(
                "{:<12} {:<10} {:<18} {}",
                format_date(entry.due_date),
                entry.status.to_string(),
                entry.vaccine_name,
                truncate_string(&entry.child_name, NAME_WIDTH),
            );
        }
        Ok(())
    }

    // ===== Export =====

    pub async fn export(&mut self, format: ExportFormat, center: &Option<String>) -> Result<()> {
        let center = self.center(center).to_string();
        let view = self.load_view(&center).await?;
        let generated_at = Local::now().naive_local();
        let contents = format.render(view.roster(), view.summary(), generated_at);

        let dir = self.config.export_dir();
        std::fs::create_dir_all(&dir).with_context(|| format!("Could not create {}", dir.display()))?;
        let path = dir.join(file_name(&center, view.roster().date, format));
        std::fs::write(&path, contents).with_context(|| format!("Could not write {}", path.display()))?;
        info!(path = %path.display(), records = view.roster().len(), "Export written");
        println!("Wrote {}", path.display());

        self.config.last_export_dir = Some(dir);
        self.config.save()?;
        Ok(())
    }
}

fn print_header(view: &AttendanceView) {
    println!("{} - {}", view.center(), format_date(view.roster().date));
    if let Some(provenance) = view.provenance() {
        println!("Source: {}", provenance.label());
    }
    print_summary(view);
    println!();
}

fn print_summary(view: &AttendanceView) {
    let s = view.summary();
    println!(
        "Total {}  Present {}  Absent {}  Late {}  Sick {}  Half day {}  Unmarked {}  Rate {}",
        s.total,
        s.present,
        s.absent,
        s.late,
        s.sick,
        s.half_day,
        s.unmarked,
        s.rate_display()
    );
}

fn print_record(record: &AttendanceRecord) {
    println!(
        "{:<12} {:<width$} {:<4} {:<9} {:<5} N:{} H:{} {}",
        truncate_string(&record.child_id, 12),
        truncate_string(&record.child_name, NAME_WIDTH),
        record.age_str(),
        record.status.as_str(),
        format_optional(&record.time_in, "-"),
        yes_no(record.nutrition_received),
        yes_no(record.health_check_done),
        format_optional(&record.notes, ""),
        width = NAME_WIDTH,
    );
}
