//! UI rendering functions

use ratatui::prelude::*;
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Scrollbar,
    ScrollbarOrientation, ScrollbarState, Table, Wrap,
};

use crate::app::App;
use zypsel::history_view::{HistoryPane, HistoryView, TreePos};
use zypsel::types::*;

pub fn ui(frame: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let changes = app.db.changed().len();
    let title_text = if changes > 0 {
        format!(" zypsel │ {changes} changes marked ")
    } else {
        " zypsel │ No changes pending ".to_string()
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::White).bg(Color::Blue).bold());
    frame.render_widget(title, main_chunks[0]);

    match app.state {
        AppState::ShowingHistory => {
            if let Some(view) = &app.history {
                render_history_view(frame, view, main_chunks[1]);
                if let Some(warning) = view.warning() {
                    render_history_warning(frame, warning, main_chunks[1]);
                }
            }
        }
        _ => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(24),
                    Constraint::Min(40),
                    Constraint::Length(38),
                ])
                .split(main_chunks[1]);

            render_filter_pane(frame, app, panes[0]);
            render_object_table(frame, app, panes[1]);
            render_details_pane(frame, app, panes[2]);

            match app.state {
                AppState::ShowingLegend => render_legend_modal(frame, main_chunks[1]),
                AppState::ConfirmExit => render_exit_confirm_modal(frame, main_chunks[1]),
                _ => {}
            }
        }
    }

    let status_style = match app.state {
        AppState::Listing => Style::default().fg(Color::Yellow),
        AppState::Searching => Style::default().fg(Color::White),
        AppState::ShowingHistory | AppState::ShowingLegend => Style::default().fg(Color::Cyan),
        AppState::ConfirmExit => Style::default().fg(Color::Red),
    };

    let status_text = match app.state {
        AppState::Searching => format!("/{}_", app.search.query),
        AppState::ShowingHistory => match &app.history {
            Some(view) if !view.is_loaded() => "Reading history...".to_string(),
            Some(view) => format!("{} days in history", view.dates().len()),
            None => String::new(),
        },
        _ => {
            if app.search.results.is_some() {
                format!("[Search: {}] {}", app.search.query, app.status_message)
            } else {
                app.status_message.clone()
            }
        }
    };
    let status = Paragraph::new(status_text)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, main_chunks[2]);

    let help_text = match app.state {
        AppState::Listing => {
            if app.search.results.is_some() {
                "/:Search │ Esc:Clear │ Space:Toggle │ +/-/>/!/*:Status │ N:Reset │ w:Save │ q:Quit"
            } else {
                "/:Search │ Space:Toggle │ +/-/>/!/*:Status │ ←→:Tabs │ H:History │ ?:Legend │ w:Save │ q:Quit"
            }
        }
        AppState::Searching => "Enter:Confirm │ Esc:Cancel │ Type to search...",
        AppState::ShowingHistory => "Tab:Switch pane │ ↑↓:Move │ Enter/Space:Expand │ Esc/q:Close",
        AppState::ShowingLegend => "Esc/q/?:Close",
        AppState::ConfirmExit => "y/Enter:Quit │ n/Esc:Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, main_chunks[3]);

    if app.state == AppState::Searching {
        // Cursor after "/<query>" in the status bar (inside border: +1 x, +1 y)
        let cursor_x = main_chunks[2].x + 1 + 1 + app.search.query.len() as u16;
        let cursor_y = main_chunks[2].y + 1;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_filter_pane(frame: &mut Frame, app: &mut App, area: Rect) {
    let is_focused = app.ui.focused_pane == FocusedPane::Filters;
    let selected = app.selected_filter();

    let items: Vec<ListItem> = FilterCategory::all()
        .iter()
        .map(|cat| {
            let label = format!("{} ({})", cat.label(), app.db.filter_count(*cat));
            let style = if *cat == selected {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Filters ")
                .borders(Borders::ALL)
                .border_style(border_style(is_focused)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.ui.filter_state);
}

fn render_object_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let is_focused = app.ui.focused_pane == FocusedPane::Objects;
    let visible_cols = Column::visible_columns(&app.settings.columns);

    let header_cells: Vec<Cell> = visible_cols
        .iter()
        .map(|col| Cell::from(col.header()).style(Style::default().fg(Color::Cyan).bold()))
        .collect();
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .list
        .iter()
        .map(|obj| {
            let cells: Vec<Cell> = visible_cols
                .iter()
                .map(|col| match col {
                    Column::Status => Cell::from(obj.status.symbol())
                        .style(Style::default().fg(obj.status.color())),
                    Column::Name => {
                        let style = if obj.status.is_modified() {
                            Style::default().fg(Color::White).bold()
                        } else {
                            Style::default()
                        };
                        Cell::from(obj.name.as_str()).style(style)
                    }
                    Column::InstalledVersion => {
                        if obj.installed_version.is_empty() {
                            Cell::from("-")
                        } else {
                            Cell::from(obj.installed_version.as_str())
                        }
                    }
                    Column::CandidateVersion => Cell::from(obj.candidate_version.as_str())
                        .style(Style::default().fg(Color::Green)),
                    Column::Summary => Cell::from(obj.summary.as_str()),
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let widths: Vec<Constraint> = visible_cols.iter().map(|col| col.width(&app.col_widths)).collect();
    let noun = if app.selected_filter() == FilterCategory::Patches {
        "Patches"
    } else {
        "Packages"
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" {noun} ({}) ", app.list.len()))
                .borders(Borders::ALL)
                .border_style(border_style(is_focused)),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, &mut app.ui.table_state);

    if !app.list.is_empty() {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(app.list.len())
            .position(app.ui.table_state.selected().unwrap_or(0));

        let scrollbar_area = Rect {
            x: area.x + area.width - 1,
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(2),
        };
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

fn render_details_pane(frame: &mut Frame, app: &mut App, area: Rect) {
    let is_focused = app.ui.focused_pane == FocusedPane::Details;

    let block = Block::default()
        .title(format!(" {} ", app.details.tab.label()))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let tabs: Vec<Span> = [
        DetailsTab::Info,
        DetailsTab::Versions,
        DetailsTab::Dependencies,
        DetailsTab::Contents,
    ]
    .iter()
    .flat_map(|tab| {
        let style = if *tab == app.details.tab {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        [Span::styled(format!("[{}]", tab.label()), style), Span::raw(" ")]
    })
    .collect();
    frame.render_widget(Paragraph::new(Line::from(tabs)), chunks[0]);

    let Some(obj) = app.selected_object().cloned() else {
        frame.render_widget(
            Paragraph::new(Span::styled("Nothing selected", Style::default().fg(Color::DarkGray))),
            chunks[1],
        );
        return;
    };

    if app.details.tab == DetailsTab::Info {
        render_info(frame, app, &obj, chunks[1]);
        return;
    }

    if app.details.rows.is_empty() {
        let empty = match app.details.tab {
            DetailsTab::Versions => "No versions available",
            DetailsTab::Dependencies => "No dependencies",
            _ => "Not a patch",
        };
        frame.render_widget(
            Paragraph::new(Span::styled(empty, Style::default().fg(Color::DarkGray))),
            chunks[1],
        );
        return;
    }

    let items: Vec<ListItem> = app
        .details
        .rows
        .iter()
        .map(|row| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<2}", row.status.symbol()), Style::default().fg(row.status.color())),
                Span::raw(row.label.as_str()),
                Span::styled(format!("  {}", row.extra), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items).highlight_style(if is_focused {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    });
    frame.render_stateful_widget(list, chunks[1], &mut app.details.row_state);
}

fn render_info(frame: &mut Frame, app: &App, obj: &ObjectInfo, area: Rect) {
    let Some(sel) = app.db.get(obj.id) else {
        return;
    };

    let mut content = vec![
        Line::from(vec![
            Span::styled(
                if obj.kind == ObjectKind::Patch { "Patch: " } else { "Package: " },
                Style::default().fg(Color::Cyan).bold(),
            ),
            Span::raw(obj.name.as_str()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Cyan)),
            Span::styled(obj.status.symbol(), Style::default().fg(obj.status.color())),
            Span::raw(format!(" {}", obj.status.label())),
        ]),
        Line::from(vec![
            Span::styled("Installed: ", Style::default().fg(Color::Cyan)),
            Span::raw(if obj.installed_version.is_empty() {
                "(none)"
            } else {
                obj.installed_version.as_str()
            }),
        ]),
        Line::from(vec![
            Span::styled("Candidate: ", Style::default().fg(Color::Green)),
            Span::raw(obj.candidate_version.as_str()),
        ]),
    ];

    if let Some(cand) = sel.candidate_version() {
        content.push(Line::from(vec![
            Span::styled("Repository: ", Style::default().fg(Color::Cyan)),
            Span::raw(cand.repo.as_str()),
        ]));
    }
    if !sel.category().is_empty() {
        content.push(Line::from(vec![
            Span::styled("Category: ", Style::default().fg(Color::Cyan)),
            Span::raw(sel.category()),
        ]));
    }

    content.extend([
        Line::from(""),
        Line::from(Span::styled("Summary:", Style::default().fg(Color::Cyan).bold())),
        Line::from(obj.summary.as_str()),
    ]);

    let info = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .scroll((app.details.scroll, 0));
    frame.render_widget(info, area);
}

fn render_history_view(frame: &mut Frame, view: &HistoryView, area: Rect) {
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(30)])
        .split(area);

    let dates: Vec<ListItem> = view.dates().iter().map(|d| ListItem::new(d.as_str())).collect();
    let dates_list = List::new(dates)
        .block(
            Block::default()
                .title(" Dates ")
                .borders(Borders::ALL)
                .border_style(border_style(view.focus() == HistoryPane::Dates)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut dates_state = ListState::default().with_selected(view.selected_date());
    frame.render_stateful_widget(dates_list, panes[0], &mut dates_state);

    let groups = view.groups();
    let rows: Vec<ListItem> = view
        .visible_rows()
        .into_iter()
        .map(|pos| match pos {
            TreePos::Group(g) => {
                let group = &groups[g];
                let marker = if group.expanded { "▾" } else { "▸" };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{marker} ")),
                    Span::styled(group.date.as_str(), Style::default().fg(Color::Cyan).bold()),
                ]))
            }
            TreePos::Action { group, index } => {
                let action = &groups[group].actions[index];
                let mut spans = vec![
                    Span::raw("    "),
                    Span::styled(format!("{} ", action.icon.symbol()), Style::default().fg(Color::Yellow)),
                ];
                for (i, column) in action.columns.iter().enumerate() {
                    let style = if i == 0 {
                        Style::default()
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    spans.push(Span::styled(format!("{column}  "), style));
                }
                ListItem::new(Line::from(spans))
            }
        })
        .collect();

    let actions_list = List::new(rows)
        .block(
            Block::default()
                .title(" Actions ")
                .borders(Borders::ALL)
                .border_style(border_style(view.focus() == HistoryPane::Actions)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut actions_state = ListState::default()
        .with_offset(view.action_offset())
        .with_selected(view.current_action_row());
    frame.render_stateful_widget(actions_list, panes[1], &mut actions_state);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let modal_width = width.min(area.width.saturating_sub(4));
    let modal_height = height.min(area.height.saturating_sub(2));
    let modal_x = area.x + (area.width - modal_width) / 2;
    let modal_y = area.y + (area.height - modal_height) / 2;
    Rect::new(modal_x, modal_y, modal_width, modal_height)
}

fn render_history_warning(frame: &mut Frame, warning: &str, area: Rect) {
    let modal_area = centered(area, 60, 8);
    frame.render_widget(Clear, modal_area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Unable to read history",
            Style::default().fg(Color::Red).bold(),
        )),
        Line::from(""),
        Line::from(warning),
        Line::from(""),
        Line::from(Span::styled("Press any key", Style::default().fg(Color::DarkGray))),
    ];

    let modal = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Warning ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(modal, modal_area);
}

fn render_legend_modal(frame: &mut Frame, area: Rect) {
    let modal_area = centered(area, 36, Status::ALL.len() as u16 + 4);
    frame.render_widget(Clear, modal_area);

    let mut lines = vec![Line::from("")];
    lines.extend(Status::ALL.iter().map(|status| {
        Line::from(vec![
            Span::styled(format!(" {:<2}", status.symbol()), Style::default().fg(status.color())),
            Span::raw(status.label()),
        ])
    }));

    let modal = Paragraph::new(lines).block(
        Block::default()
            .title(" Legend ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(modal, modal_area);
}

fn render_exit_confirm_modal(frame: &mut Frame, area: Rect) {
    let modal_area = centered(area, 50, 7);
    frame.render_widget(Clear, modal_area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "You have unsaved changes!",
            Style::default().fg(Color::Red).bold(),
        )),
        Line::from(""),
        Line::from("Really quit without saving?"),
        Line::from(""),
        Line::from(Span::styled(
            "y/Enter: Quit │ n/Esc: Cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let modal = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Confirm Exit ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(modal, modal_area);
}
