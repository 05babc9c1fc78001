use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use taskboard::card::{Aging, Card, DependencyKind, DueStatus, Priority};
use taskboard::config::Config;
use taskboard::dates;
use taskboard::filter::{
    CompletionFilter, DueFilterStatus, FilterCriteria, FilterManager, LabelMatch, SearchFields,
    SearchOperator,
};
use taskboard::gantt::{self, DependencyIssue, GanttManager, ZoomLevel, BAR_GUTTER};
use taskboard::randomizer::{self, RandomizerOptions};
use taskboard::storage::{self, DataLocation, DataScope, FileStore, SharedStore};
use taskboard::store::{CardEntry, Store};
use taskboard::templates::Template;
use taskboard::Label;

use crate::cli::{BoardAction, ColumnAction, FilterArgs, LabelAction, PresetAction};

pub struct Session {
    pub config: Config,
    pub location: DataLocation,
    pub storage: SharedStore,
    pub store: Store,
}

impl Session {
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let config = Config::load()?;
        let location = match data_dir.or_else(|| config.data_dir.clone()) {
            Some(dir) => DataLocation {
                dir,
                scope: DataScope::Project,
            },
            None => storage::locate_from_cwd().context("locating board data")?,
        };
        tracing::debug!(dir = ?location.dir, "opening board data");
        let storage: SharedStore = Rc::new(FileStore::new(location.dir.clone()));
        let store = Store::load(Rc::clone(&storage), config.store_options());
        Ok(Session {
            config,
            location,
            storage,
            store,
        })
    }

    fn filters(&self) -> FilterManager {
        FilterManager::new(Rc::clone(&self.storage), self.config.locale)
    }

    fn close(mut self) -> Result<()> {
        self.store.flush().context("saving board data")?;
        Ok(())
    }
}

pub fn init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let location = storage::init_project_dir(&cwd).context("creating .taskboard directory")?;
    let session = Session::open(Some(location.dir.clone()))?;
    println!("Initialized board data at {}", location.dir.display());
    session.close()
}

pub fn boards(mut session: Session, action: Option<BoardAction>) -> Result<()> {
    let store = &mut session.store;
    match action {
        None => {
            let active = store.get_active_board().id.clone();
            println!(
                "Boards ({}, {})",
                session.location.dir.display(),
                match session.location.scope {
                    DataScope::Project => "project",
                    DataScope::Global => "global",
                }
            );
            for board in store.boards() {
                let marker = if board.id == active { "*" } else { " " };
                println!(
                    "{} {}: {} ({} columns, {} cards)",
                    marker,
                    board.id,
                    board.name,
                    board.columns.len(),
                    board.cards().count()
                );
            }
        }
        Some(BoardAction::New { name, template }) => {
            let template = match template {
                Some(t) => Template::parse(&t).ok_or_else(|| anyhow!("unknown template: {}", t))?,
                None => session.config.default_template,
            };
            let id = store.create_board(&name, template);
            println!("Created board {} ({})", id, name);
        }
        Some(BoardAction::Switch { board_id }) => {
            if !store.switch_board(&board_id) {
                bail!("board {} not found", board_id);
            }
            println!("Active board is now {}", board_id);
        }
        Some(BoardAction::Rename { board_id, name }) => {
            if !store.rename_board(&board_id, &name) {
                bail!("board {} not found", board_id);
            }
            println!("Renamed board {}", board_id);
        }
        Some(BoardAction::Delete { board_id }) => {
            if !store.delete_board(&board_id) {
                bail!("cannot delete board {} (unknown, or the last board)", board_id);
            }
            println!("Deleted board {}", board_id);
        }
    }
    session.close()
}

pub fn columns(mut session: Session, action: ColumnAction) -> Result<()> {
    let store = &mut session.store;
    match action {
        ColumnAction::Add { title } => {
            let id = store
                .add_column(&title)
                .ok_or_else(|| anyhow!("could not add column"))?;
            println!("Added column {} ({})", id, title);
        }
        ColumnAction::Rename { column_id, title } => {
            if !store.rename_column(&column_id, &title) {
                bail!("column {} not found", column_id);
            }
            println!("Renamed column {}", column_id);
        }
        ColumnAction::Rm { column_id } => {
            if !store.remove_column(&column_id) {
                bail!("column {} not found", column_id);
            }
            println!("Removed column {}", column_id);
        }
        ColumnAction::Order { column_ids } => {
            store.reorder_columns(&column_ids);
            let titles: Vec<&str> = store
                .get_active_board()
                .columns
                .iter()
                .map(|c| c.title.as_str())
                .collect();
            println!("Columns: {}", titles.join(" | "));
        }
    }
    session.close()
}

pub fn labels(mut session: Session, action: Option<LabelAction>) -> Result<()> {
    let store = &mut session.store;
    match action {
        None => {
            for label in store.labels() {
                println!("{}: {} {}", label.id, label.name, label.color);
            }
        }
        Some(LabelAction::Add { name, color }) => {
            let id = store
                .add_label(&name, &color)
                .ok_or_else(|| anyhow!("could not add label"))?;
            println!("Added label {} ({})", id, name);
        }
        Some(LabelAction::Rename { label_id, name }) => {
            if !store.update_label(&label_id, Some(&name), None) {
                bail!("label {} not found", label_id);
            }
            println!("Renamed label {}", label_id);
        }
        Some(LabelAction::Rm { label_id }) => {
            if !store.remove_label(&label_id) {
                bail!("label {} not found", label_id);
            }
            println!("Removed label {}", label_id);
        }
    }
    session.close()
}

pub fn list(session: Session, filter: FilterArgs, preset: Option<String>) -> Result<()> {
    let mut filters = session.filters();
    if let Some(name) = preset {
        let id = filters
            .find_preset(&name)
            .map(|p| p.id.clone())
            .ok_or_else(|| anyhow!("preset {} not found", name))?;
        filters.apply_preset(&id);
    }
    let criteria = build_criteria(filters.criteria().clone(), &filter)?;
    filters.set_criteria(criteria);

    let store = &session.store;
    let board = store.get_active_board();
    let entries = store.get_all_cards();
    let visible = filters.apply_filters(&entries, &board.labels);

    println!("Board: {}", board.name);
    let chips = filters.get_active_filter_chips(&board.labels);
    if !chips.is_empty() {
        let text: Vec<&str> = chips.iter().map(|c| c.label.as_str()).collect();
        println!("Filters: {}", text.join(" / "));
    }
    println!();
    let today = dates::today();
    for column in &board.columns {
        println!("{} [{}]", column.title, column.id);
        let cards: Vec<&CardEntry> = visible.iter().filter(|e| e.column_id == column.id).collect();
        if cards.is_empty() {
            println!("  (empty)");
        }
        for entry in cards {
            print_card(entry.card, &board.labels, today);
        }
        println!();
    }
    session.close()
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    mut session: Session,
    text: String,
    column: Option<String>,
    description: Option<String>,
    start: Option<String>,
    due: Option<String>,
    priority: Option<String>,
    effort: Option<f64>,
    labels: Vec<String>,
) -> Result<()> {
    let store = &mut session.store;
    let column_id = column
        .or_else(|| store.get_active_board().columns.first().map(|c| c.id.clone()))
        .ok_or_else(|| anyhow!("board has no columns"))?;
    let start = parse_date_arg(start.as_deref())?;
    let due = parse_date_arg(due.as_deref())?;
    let priority = parse_priority(priority.as_deref())?;
    for label in &labels {
        if store.get_active_board().label(label).is_none() {
            bail!("label {} not found", label);
        }
    }
    let id = store.batch(|s| {
        let id = s.add_card(&column_id, &text)?;
        s.update_card(&id, |card| {
            if let Some(d) = description {
                card.description = d;
            }
            card.start_date = start;
            card.due_date = due;
            if let Some(p) = priority {
                card.priority = p;
            }
            if let Some(e) = effort {
                card.effort = e;
            }
            card.labels = labels;
        });
        Some(id)
    });
    let id = id.ok_or_else(|| anyhow!("column {} not found", column_id))?;
    println!("Added card {} to {}", id, column_id);
    session.close()
}

#[allow(clippy::too_many_arguments)]
pub fn edit(
    mut session: Session,
    card_id: String,
    text: Option<String>,
    description: Option<String>,
    start: Option<String>,
    clear_start: bool,
    due: Option<String>,
    clear_due: bool,
    priority: Option<String>,
    effort: Option<f64>,
) -> Result<()> {
    let start = parse_date_arg(start.as_deref())?;
    let due = parse_date_arg(due.as_deref())?;
    let priority = parse_priority(priority.as_deref())?;
    let updated = session.store.update_card(&card_id, |card| {
        if let Some(t) = text {
            card.text = t;
        }
        if let Some(d) = description {
            card.description = d;
        }
        if clear_start {
            card.start_date = None;
        }
        if start.is_some() {
            card.start_date = start;
        }
        if clear_due {
            card.due_date = None;
        }
        if due.is_some() {
            card.due_date = due;
        }
        if let Some(p) = priority {
            card.priority = p;
        }
        if let Some(e) = effort {
            card.effort = e;
        }
    });
    if !updated {
        bail!("card {} not found", card_id);
    }
    println!("Updated card {}", card_id);
    session.close()
}

pub fn move_card(
    mut session: Session,
    card_id: String,
    column_id: String,
    position: Option<usize>,
) -> Result<()> {
    let store = &mut session.store;
    let source = store
        .find_card(&card_id)
        .map(|e| e.column_id.to_string())
        .ok_or_else(|| anyhow!("card {} not found", card_id))?;
    let mut order: Vec<String> = store
        .get_active_board()
        .column(&column_id)
        .ok_or_else(|| anyhow!("column {} not found", column_id))?
        .cards
        .iter()
        .map(|c| c.id.clone())
        .filter(|id| *id != card_id)
        .collect();
    let at = position.unwrap_or(order.len()).min(order.len());
    order.insert(at, card_id.clone());
    if !store.move_card(&card_id, &source, &column_id, &order) {
        bail!("could not move card {} to {}", card_id, column_id);
    }
    println!("Moved card {} to {}", card_id, column_id);
    session.close()
}

pub fn done(mut session: Session, card_id: String) -> Result<()> {
    if !session.store.toggle_card_completed(&card_id) {
        bail!("card {} not found", card_id);
    }
    let completed = session
        .store
        .find_card(&card_id)
        .map(|e| e.card.completed)
        .unwrap_or_default();
    println!(
        "Card {} marked {}",
        card_id,
        if completed { "done" } else { "open" }
    );
    session.close()
}

pub fn remove(mut session: Session, card_id: String) -> Result<()> {
    if !session.store.remove_card(&card_id) {
        bail!("card {} not found", card_id);
    }
    println!("Removed card {}", card_id);
    session.close()
}

pub fn duplicate(mut session: Session, card_id: String) -> Result<()> {
    let column_id = session
        .store
        .find_card(&card_id)
        .map(|e| e.column_id.to_string())
        .ok_or_else(|| anyhow!("card {} not found", card_id))?;
    let id = session
        .store
        .duplicate_card(&column_id, &card_id)
        .ok_or_else(|| anyhow!("could not duplicate card {}", card_id))?;
    println!("Duplicated {} as {}", card_id, id);
    session.close()
}

pub fn log(mut session: Session, card_id: String, text: String) -> Result<()> {
    session
        .store
        .add_log(&card_id, &text)
        .ok_or_else(|| anyhow!("card {} not found", card_id))?;
    println!("Logged on card {}", card_id);
    session.close()
}

pub fn tag(mut session: Session, card_id: String, label_id: String) -> Result<()> {
    if !session.store.toggle_card_label(&card_id, &label_id) {
        bail!("card {} or label {} not found", card_id, label_id);
    }
    println!("Toggled label {} on {}", label_id, card_id);
    session.close()
}

pub fn depend(
    mut session: Session,
    card_id: String,
    on: String,
    kind: String,
    remove: bool,
) -> Result<()> {
    if remove {
        if !session.store.remove_dependency(&card_id, &on) {
            bail!("card {} does not depend on {}", card_id, on);
        }
        println!("Removed dependency {} -> {}", card_id, on);
    } else {
        let kind = DependencyKind::parse(&kind)
            .ok_or_else(|| anyhow!("unknown dependency type {} (use FS, SS, FF or SF)", kind))?;
        if !session.store.add_dependency(&card_id, &on, kind) {
            bail!("cannot link {} to {}", card_id, on);
        }
        println!("{} now depends on {}", card_id, on);
    }
    session.close()
}

pub fn gantt(session: Session, zoom: Option<String>) -> Result<()> {
    let mut manager = GanttManager::new(session.config.locale);
    if let Some(z) = zoom {
        manager.set_zoom(ZoomLevel::parse(&z).ok_or_else(|| anyhow!("unknown zoom level: {}", z))?);
    }
    let board = session.store.get_active_board();
    let data = manager.transform_to_gantt_data(&board.columns, &board.labels);
    let range = manager.calculate_date_range(&data.scheduled);
    let headers = manager.generate_timeline_headers(&range);
    let cell = manager.cell_width();
    const NAME_WIDTH: usize = 24;

    println!(
        "{} to {} ({} days)",
        dates::format_date(range.start),
        dates::format_date(range.end),
        range.days
    );
    let mut group_line = " ".repeat(NAME_WIDTH + 1);
    for group in &headers.groups {
        group_line.push_str(&fit(&group.label, group.span));
    }
    println!("{}", group_line);
    let day_line: String = headers
        .days
        .iter()
        .map(|d| if d.is_today { '|' } else if d.is_weekend { '.' } else { ' ' })
        .collect();
    println!("{} {}", " ".repeat(NAME_WIDTH), day_line);

    for task in &data.scheduled {
        let pos = manager.calculate_task_position(task, &range);
        let from = (pos.left / cell).round() as usize;
        let len = ((pos.width + BAR_GUTTER) / cell).round() as usize;
        let mut bar: Vec<char> = headers
            .days
            .iter()
            .map(|d| if d.is_today { '|' } else { ' ' })
            .collect();
        for slot in bar.iter_mut().skip(from).take(len.max(1)) {
            *slot = if task.card.completed { '=' } else { '#' };
        }
        println!(
            "{} {}",
            fit(&task.card.text, NAME_WIDTH),
            bar.into_iter().collect::<String>()
        );
    }
    if !data.unscheduled.is_empty() {
        println!();
        println!("Unscheduled:");
        for task in &data.unscheduled {
            println!("  - {}: {}", task.card.id, task.card.text);
        }
    }
    session.close()
}

pub fn validate(session: Session) -> Result<()> {
    let cards: Vec<&Card> = session.store.get_active_board().cards().collect();
    let issues = gantt::validate_dependencies(&cards);
    if issues.is_empty() {
        println!("Dependencies OK ({} cards)", cards.len());
    }
    for issue in &issues {
        match issue {
            DependencyIssue::Cycle { path } => {
                println!("cycle: {} -> {}", path.join(" -> "), path[0]);
            }
            DependencyIssue::Missing {
                task_id,
                dependency_id,
            } => println!("missing: {} depends on unknown {}", task_id, dependency_id),
        }
    }
    session.close()
}

pub fn pick(
    session: Session,
    columns: Vec<String>,
    include_completed: bool,
    no_priority: bool,
    no_due: bool,
    aging: bool,
    save: bool,
) -> Result<()> {
    let mut options = RandomizerOptions::load(&session.storage);
    if !columns.is_empty() {
        options.include_columns = columns;
    }
    if include_completed {
        options.exclude_completed = false;
    }
    if no_priority {
        options.factor_priority = false;
    }
    if no_due {
        options.factor_due_date = false;
    }
    if aging {
        options.factor_aging = true;
    }
    if save {
        options
            .save(&session.storage)
            .context("saving randomizer options")?;
    }
    let entries = session.store.get_all_cards();
    match randomizer::pick(&entries, &options, &mut rand::thread_rng()) {
        Some(entry) => println!(
            "Next up: {} ({}) in {}",
            entry.card.text, entry.card.id, entry.column_title
        ),
        None => println!("Nothing to pick"),
    }
    session.close()
}

pub fn export(session: Session, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| {
        PathBuf::from(format!(
            "taskboard-export-{}.json",
            Local::now().format("%Y-%m-%d")
        ))
    });
    let json = session.store.export_data().context("serializing boards")?;
    fs::write(&path, json).with_context(|| format!("writing {:?}", path))?;
    println!("Exported {} boards to {}", session.store.boards().len(), path.display());
    session.close()
}

pub fn import(mut session: Session, path: PathBuf) -> Result<()> {
    let json = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    if !session.store.import_data(&json) {
        bail!("{} is not a valid board export", path.display());
    }
    println!("Imported {} boards", session.store.boards().len());
    session.close()
}

pub fn presets(session: Session, action: Option<PresetAction>) -> Result<()> {
    let mut filters = session.filters();
    match action {
        None => {
            if filters.presets().is_empty() {
                println!("No saved presets");
            }
            for preset in filters.presets() {
                println!("{}: {}", preset.id, preset.name);
            }
        }
        Some(PresetAction::Save { name, filter }) => {
            let criteria = build_criteria(FilterCriteria::default(), &filter)?;
            if !criteria.is_active() {
                bail!("no filter flags given");
            }
            filters.set_criteria(criteria);
            let id = filters.create_preset(&name);
            println!("Saved preset {} ({})", id, name);
        }
        Some(PresetAction::Rm { preset_id }) => {
            let id = filters
                .find_preset(&preset_id)
                .map(|p| p.id.clone())
                .ok_or_else(|| anyhow!("preset {} not found", preset_id))?;
            filters.delete_preset(&id);
            println!("Removed preset {}", preset_id);
        }
    }
    session.close()
}

fn build_criteria(mut criteria: FilterCriteria, args: &FilterArgs) -> Result<FilterCriteria> {
    if let Some(term) = &args.search {
        criteria.search.term = term.clone();
    }
    if !args.search_in.is_empty() {
        let mut fields = SearchFields {
            text: false,
            description: false,
            labels: false,
            logs: false,
        };
        for field in &args.search_in {
            match field.as_str() {
                "text" => fields.text = true,
                "description" => fields.description = true,
                "labels" => fields.labels = true,
                "logs" => fields.logs = true,
                other => bail!("unknown search field: {}", other),
            }
        }
        criteria.search.fields = fields;
    }
    if let Some(op) = &args.match_op {
        criteria.search.operator = match op.as_str() {
            "contains" => SearchOperator::Contains,
            "exact" => SearchOperator::Exact,
            "starts-with" => SearchOperator::StartsWith,
            "not-contains" => SearchOperator::NotContains,
            other => bail!("unknown match operator: {}", other),
        };
    }
    if args.case_sensitive {
        criteria.search.case_sensitive = true;
    }
    if !args.labels.is_empty() {
        criteria.labels.selected = args.labels.clone();
    }
    if let Some(mode) = &args.label_mode {
        criteria.labels.mode = match mode.as_str() {
            "any" => LabelMatch::Any,
            "all" => LabelMatch::All,
            "none" => LabelMatch::None,
            other => bail!("unknown label mode: {}", other),
        };
    }
    if !args.priorities.is_empty() {
        criteria.priorities = args
            .priorities
            .iter()
            .map(|p| Priority::parse(p).ok_or_else(|| anyhow!("unknown priority: {}", p)))
            .collect::<Result<_>>()?;
    }
    if let Some(status) = &args.due_status {
        criteria.due_date.status = Some(
            DueFilterStatus::parse(status).ok_or_else(|| anyhow!("unknown due status: {}", status))?,
        );
    }
    if args.due_from.is_some() {
        criteria.due_date.range.from = parse_date_value(args.due_from.as_deref())?;
    }
    if args.due_to.is_some() {
        criteria.due_date.range.to = parse_date_value(args.due_to.as_deref())?;
    }
    if args.start_from.is_some() {
        criteria.start_date.from = parse_date_value(args.start_from.as_deref())?;
    }
    if args.start_to.is_some() {
        criteria.start_date.to = parse_date_value(args.start_to.as_deref())?;
    }
    if args.completed {
        criteria.completion = CompletionFilter::Completed;
    } else if args.incomplete {
        criteria.completion = CompletionFilter::Incomplete;
    }
    if args.min_effort.is_some() {
        criteria.effort.min = args.min_effort;
    }
    if args.max_effort.is_some() {
        criteria.effort.max = args.max_effort;
    }
    if let Some(aging) = &args.aging {
        criteria.aging = Some(match aging.as_str() {
            "fresh" => Aging::Fresh,
            "aging" => Aging::Aging,
            "stale" => Aging::Stale,
            "abandoned" => Aging::Abandoned,
            other => bail!("unknown aging bucket: {}", other),
        });
    }
    Ok(criteria)
}

fn parse_date_value(input: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => dates::parse_date(raw)
            .map(Some)
            .ok_or_else(|| anyhow!("invalid date (use YYYY-MM-DD): {}", raw)),
    }
}

fn parse_date_arg(input: Option<&str>) -> Result<Option<String>> {
    Ok(parse_date_value(input)?.map(dates::format_date))
}

fn parse_priority(input: Option<&str>) -> Result<Option<Priority>> {
    input
        .map(|p| Priority::parse(p).ok_or_else(|| anyhow!("unknown priority: {}", p)))
        .transpose()
}

fn fit(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{:width$}", truncated, width = width)
}

fn print_card(card: &Card, labels: &[Label], today: chrono::NaiveDate) {
    let check = if card.completed { "x" } else { " " };
    println!("  [{}] {}: {}", check, card.id, card.text);
    if !card.description.is_empty() {
        println!("      {}", card.description);
    }
    let mut meta = Vec::new();
    if card.priority != Priority::None {
        meta.push(format!("priority {}", card.priority.as_str()));
    }
    if let Some(start) = card.start() {
        meta.push(format!("start {}", dates::format_date(start)));
    }
    if let Some(due) = card.due() {
        let flag = match card.due_status_at(today) {
            Some(DueStatus::Overdue) => " (overdue)",
            Some(DueStatus::Today) => " (today)",
            _ => "",
        };
        meta.push(format!("due {}{}", dates::format_date(due), flag));
    }
    if card.effort > 0.0 {
        meta.push(format!("{}h", card.effort));
    }
    if !meta.is_empty() {
        println!("      {}", meta.join(", "));
    }
    let names: Vec<&str> = card
        .labels
        .iter()
        .filter_map(|id| labels.iter().find(|l| &l.id == id))
        .map(|l| l.name.as_str())
        .collect();
    if !names.is_empty() {
        println!("      #{}", names.join(" #"));
    }
    if !card.dependencies.is_empty() {
        let deps: Vec<&str> = card.dependencies.iter().map(|d| d.id.as_str()).collect();
        println!("      after {}", deps.join(", "));
    }
}
