/// New tab page: most visited sites, bookmark tiles and groups

use log::{error, info};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::bookmark_data::{Bookmark, MostVisitedSite, Theme};
use crate::chrome::ChromeHost;
use crate::config::{FaviconConfig, NewTabConfig};
use crate::domain::display_domain;
use crate::drag::{ItemKind, ItemRef, Rect};
use crate::error::Error;
use crate::library::{
    BookmarkLibrary, DropOutcome, import_html, load_most_visited, load_theme, remove_most_visited, rename_most_visited,
    save_theme,
};
use crate::operations::DisplayItem;
use crate::session::{Mode, Session};

use super::components::{BookmarkTile, DragHandlers, Favicons, GroupTile, MostVisitedTile};

#[derive(Clone, PartialEq)]
enum PageState {
    Loading,
    Idle,
    Notice(String),
    Error(String),
}

/// Add/edit dialog contents; `id` is set when editing
#[derive(Clone, PartialEq, Default)]
struct BookmarkForm {
    id: Option<String>,
    title: String,
    url: String,
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|window| window.confirm_with_message(message).ok())
        .unwrap_or(false)
}

fn prompt(message: &str, default: &str) -> Option<String> {
    web_sys::window()?
        .prompt_with_message_and_default(message, default)
        .ok()
        .flatten()
}

fn apply_theme(theme: Theme) {
    let root = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.document_element());
    if let Some(root) = root {
        if let Err(e) = root.set_attribute("data-theme", theme.as_str()) {
            error!("Failed to apply theme: {:?}", e);
        }
    }
}

async fn refresh_most_visited(limit: usize, most_visited: UseStateHandle<Vec<MostVisitedSite>>) {
    match load_most_visited(&ChromeHost, limit).await {
        Ok(sites) => most_visited.set(sites),
        Err(e) => error!("Error loading most visited sites: {}", e),
    }
}

#[function_component(NewTab)]
pub fn new_tab() -> Html {
    let state = use_state(|| PageState::Loading);
    let library = use_state(BookmarkLibrary::default);
    let session = use_state_eq(Session::new);
    let most_visited = use_state(Vec::<MostVisitedSite>::new);
    let theme = use_state(Theme::default);
    let query = use_state(String::new);
    let form = use_state(|| None::<BookmarkForm>);
    let reload = use_state(|| 0u32);
    let fresh_group = use_state(|| None::<String>);
    let limit = use_state(|| NewTabConfig::default().most_visited_limit);
    let favicons = use_state(|| Favicons::new(FaviconConfig::default()));

    // Settings, theme and most visited on mount
    {
        let theme = theme.clone();
        let limit = limit.clone();
        let favicons = favicons.clone();
        let most_visited = most_visited.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let host = ChromeHost::new();
                let config = NewTabConfig::load(&host).await;
                favicons.set(Favicons::new(config.favicon.clone()));
                limit.set(config.most_visited_limit);

                match load_theme(&host).await {
                    Ok(stored) => {
                        apply_theme(stored);
                        theme.set(stored);
                    }
                    Err(e) => error!("Error loading theme: {}", e),
                }

                refresh_most_visited(config.most_visited_limit, most_visited).await;
            });
            || ()
        });
    }

    // Bookmarks, on mount and after bulk changes
    {
        let state = state.clone();
        let library = library.clone();

        use_effect_with(*reload, move |_| {
            spawn_local(async move {
                match BookmarkLibrary::load(&ChromeHost).await {
                    Ok(loaded) => {
                        library.set(loaded);
                        state.set(PageState::Idle);
                    }
                    Err(e) => {
                        error!("Error loading bookmarks: {}", e);
                        state.set(PageState::Error(format!("Failed to load bookmarks: {}", e)));
                    }
                }
            });
            || ()
        });
    }

    let on_search_input = {
        let query = query.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                query.set(input.value());
            }
        })
    };

    let on_toggle_theme = {
        let theme = theme.clone();
        Callback::from(move |_: MouseEvent| {
            let next = if theme.is_dark() { Theme::Light } else { Theme::Dark };
            apply_theme(next);
            theme.set(next);
            spawn_local(async move {
                if let Err(e) = save_theme(&ChromeHost, next).await {
                    error!("Error saving theme: {}", e);
                }
            });
        })
    };

    let on_toggle_edit = {
        let session = session.clone();
        let library = library.clone();
        Callback::from(move |_: MouseEvent| {
            let mut next = (*session).clone();
            if next.is_editing() {
                if next.exit_edit() {
                    let library = library.clone();
                    spawn_local(async move {
                        let mut updated = (*library).clone();
                        match updated.save_orders(&ChromeHost).await {
                            Ok(()) => library.set(updated),
                            Err(e) => error!("Error saving order: {}", e),
                        }
                    });
                }
            } else {
                next.enter_edit();
            }
            session.set(next);
        })
    };

    let on_toggle_select_mode = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            let mut next = (*session).clone();
            if next.is_selecting() {
                next.exit_selection();
            } else {
                next.enter_selection();
            }
            session.set(next);
        })
    };

    let on_toggle_select = {
        let session = session.clone();
        Callback::from(move |id: String| {
            let mut next = (*session).clone();
            next.toggle_selected(&id);
            session.set(next);
        })
    };

    let on_delete_selected = {
        let session = session.clone();
        let reload = reload.clone();
        Callback::from(move |_: MouseEvent| {
            let ids = session.selected();
            if ids.is_empty() {
                return;
            }
            if !confirm(&format!("Are you sure you want to delete {} bookmark(s)?", ids.len())) {
                return;
            }
            let mut next = (*session).clone();
            next.exit_selection();
            session.set(next);

            let reload = reload.clone();
            spawn_local(async move {
                let deleted = BookmarkLibrary::delete_bookmarks(&ChromeHost, &ids).await;
                info!("Deleted {} of {} selected bookmarks", deleted, ids.len());
                reload.set(*reload + 1);
            });
        })
    };

    let drag_handlers = {
        let on_start = {
            let session = session.clone();
            Callback::from(move |item: ItemRef| {
                let mut next = (*session).clone();
                if next.begin_drag(item) {
                    session.set(next);
                }
            })
        };
        let on_over = {
            let session = session.clone();
            Callback::from(move |(item, rect, x, y): (ItemRef, Rect, f64, f64)| {
                let mut next = (*session).clone();
                next.drag_mut().over(item, &rect, x, y);
                session.set(next);
            })
        };
        let on_leave = {
            let session = session.clone();
            Callback::from(move |id: String| {
                let mut next = (*session).clone();
                next.drag_mut().leave(&id);
                session.set(next);
            })
        };
        let on_drop = {
            let session = session.clone();
            let library = library.clone();
            let fresh_group = fresh_group.clone();
            Callback::from(move |target_id: String| {
                let mut next = (*session).clone();
                let intent = next.drag_mut().drop(&target_id);
                session.set(next);

                if let Some(intent) = intent {
                    let library = library.clone();
                    let fresh_group = fresh_group.clone();
                    spawn_local(async move {
                        let mut updated = (*library).clone();
                        match updated.apply_drop(&ChromeHost, intent).await {
                            Ok(DropOutcome::GroupCreated(group)) => {
                                fresh_group.set(Some(group.id));
                                library.set(updated);
                            }
                            Ok(DropOutcome::Changed) => library.set(updated),
                            Ok(DropOutcome::Unchanged) => {}
                            Err(e) => error!("Error applying drop: {}", e),
                        }
                    });
                }
            })
        };
        let on_end = {
            let session = session.clone();
            Callback::from(move |_: ()| {
                let mut next = (*session).clone();
                next.end_drag();
                session.set(next);
            })
        };
        DragHandlers {
            on_start,
            on_over,
            on_leave,
            on_drop,
            on_end,
        }
    };

    let on_add_bookmark = {
        let form = form.clone();
        Callback::from(move |_: MouseEvent| form.set(Some(BookmarkForm::default())))
    };

    let on_edit_bookmark = {
        let form = form.clone();
        Callback::from(move |bookmark: Bookmark| {
            form.set(Some(BookmarkForm {
                id: Some(bookmark.id),
                title: bookmark.title,
                url: bookmark.url,
            }))
        })
    };

    let on_form_title = {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let (Some(input), Some(mut current)) = (e.target_dyn_into::<HtmlInputElement>(), (*form).clone()) {
                current.title = input.value();
                form.set(Some(current));
            }
        })
    };

    let on_form_url = {
        let form = form.clone();
        Callback::from(move |e: InputEvent| {
            if let (Some(input), Some(mut current)) = (e.target_dyn_into::<HtmlInputElement>(), (*form).clone()) {
                current.url = input.value();
                form.set(Some(current));
            }
        })
    };

    let on_cancel_form = {
        let form = form.clone();
        Callback::from(move |_: MouseEvent| form.set(None))
    };

    let on_save_form = {
        let form = form.clone();
        let library = library.clone();
        Callback::from(move |_: MouseEvent| {
            let Some(current) = (*form).clone() else {
                return;
            };
            let url = current.url.trim().to_string();
            if url.is_empty() {
                return;
            }
            form.set(None);

            let library = library.clone();
            spawn_local(async move {
                let mut updated = (*library).clone();
                let result = match &current.id {
                    Some(id) => {
                        let title = match current.title.trim() {
                            "" => display_domain(&url),
                            title => title.to_string(),
                        };
                        updated.update_bookmark(&ChromeHost, id, &title, &url).await
                    }
                    None => updated.create_bookmark(&ChromeHost, &url, &current.title).await.map(|_| ()),
                };
                match result {
                    Ok(()) => library.set(updated),
                    Err(e) => error!("Error saving bookmark: {}", e),
                }
            });
        })
    };

    let on_delete_bookmark = {
        let library = library.clone();
        Callback::from(move |id: String| {
            let title = library.get_bookmark(&id).map(|b| b.title.clone()).unwrap_or_default();
            if !confirm(&format!("Are you sure you want to delete \"{}\"?", title)) {
                return;
            }
            let library = library.clone();
            spawn_local(async move {
                let mut updated = (*library).clone();
                match updated.delete_bookmark(&ChromeHost, &id).await {
                    Ok(()) => library.set(updated),
                    Err(e) => error!("Error deleting bookmark: {}", e),
                }
            });
        })
    };

    let on_remove_member = {
        let library = library.clone();
        Callback::from(move |id: String| {
            let library = library.clone();
            spawn_local(async move {
                let mut updated = (*library).clone();
                match updated.remove_from_group(&ChromeHost, &id).await {
                    Ok(true) => library.set(updated),
                    Ok(false) => {}
                    Err(e) => error!("Error removing bookmark from group: {}", e),
                }
            });
        })
    };

    let on_rename_group = {
        let library = library.clone();
        let fresh_group = fresh_group.clone();
        Callback::from(move |(id, name): (String, String)| {
            fresh_group.set(None);
            let library = library.clone();
            spawn_local(async move {
                let mut updated = (*library).clone();
                match updated.rename_group(&ChromeHost, &id, &name).await {
                    Ok(true) => library.set(updated),
                    Ok(false) => {}
                    Err(e) => error!("Error renaming group: {}", e),
                }
            });
        })
    };

    let on_ungroup = {
        let library = library.clone();
        Callback::from(move |id: String| {
            let name = library.get_group(&id).map(|g| g.name.clone()).unwrap_or_default();
            if !confirm(&format!("Are you sure you want to ungroup \"{}\"? The bookmarks will be kept.", name)) {
                return;
            }
            let library = library.clone();
            spawn_local(async move {
                let mut updated = (*library).clone();
                match updated.ungroup(&ChromeHost, &id).await {
                    Ok(true) => library.set(updated),
                    Ok(false) => {}
                    Err(e) => error!("Error ungrouping: {}", e),
                }
            });
        })
    };

    let on_delete_group = {
        let library = library.clone();
        Callback::from(move |id: String| {
            let name = library.get_group(&id).map(|g| g.name.clone()).unwrap_or_default();
            let with_bookmarks = confirm(&format!(
                "Delete group \"{}\"?\n\nClick OK to delete the group AND its bookmarks.\nClick Cancel to keep the bookmarks.",
                name
            ));
            let library = library.clone();
            spawn_local(async move {
                let mut updated = (*library).clone();
                match updated.delete_group(&ChromeHost, &id, with_bookmarks).await {
                    Ok(true) => library.set(updated),
                    Ok(false) => {}
                    Err(e) => error!("Error deleting group: {}", e),
                }
            });
        })
    };

    let on_rename_site = {
        let limit = limit.clone();
        let most_visited = most_visited.clone();
        Callback::from(move |site: MostVisitedSite| {
            let Some(name) = prompt("Rename site", &site.title) else {
                return;
            };
            let limit = *limit;
            let most_visited = most_visited.clone();
            spawn_local(async move {
                match rename_most_visited(&ChromeHost, &site.url, name.trim()).await {
                    Ok(()) => refresh_most_visited(limit, most_visited).await,
                    Err(e) => error!("Error renaming site: {}", e),
                }
            });
        })
    };

    let on_remove_site = {
        let limit = limit.clone();
        let most_visited = most_visited.clone();
        Callback::from(move |url: String| {
            let title = most_visited
                .iter()
                .find(|site| site.url == url)
                .map(|site| site.title.clone())
                .unwrap_or_default();
            if !confirm(&format!("Are you sure you want to remove \"{}\" from most visited sites?", title)) {
                return;
            }
            let limit = *limit;
            let most_visited = most_visited.clone();
            spawn_local(async move {
                match remove_most_visited(&ChromeHost, &url).await {
                    Ok(()) => refresh_most_visited(limit, most_visited).await,
                    Err(e) => error!("Error removing site: {}", e),
                }
            });
        })
    };

    let on_import = {
        let state = state.clone();
        let reload = reload.clone();
        Callback::from(move |e: Event| {
            let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            input.set_value("");

            let state = state.clone();
            let reload = reload.clone();
            spawn_local(async move {
                let html = match JsFuture::from(file.text()).await {
                    Ok(text) => text.as_string().unwrap_or_default(),
                    Err(e) => {
                        state.set(PageState::Error(format!("Failed to read file: {:?}", e)));
                        return;
                    }
                };
                match import_html(&ChromeHost, &html).await {
                    Ok(report) => {
                        state.set(PageState::Notice(report.message()));
                        reload.set(*reload + 1);
                    }
                    Err(Error::Import(message)) => state.set(PageState::Notice(message)),
                    Err(e) => state.set(PageState::Error(format!("Import failed: {}", e))),
                }
            });
        })
    };

    let mode = session.mode();
    let drag = session.drag();
    let dragged_id = drag.dragged().map(|item| item.id.clone());
    let selected = session.selected();

    let bookmark_tile = |bookmark: &Bookmark, draggable: bool| {
        html! {
            <BookmarkTile
                key={bookmark.id.clone()}
                bookmark={bookmark.clone()}
                mode={mode}
                selected={session.is_selected(&bookmark.id)}
                zone={drag.zone_for(&bookmark.id)}
                dragging={dragged_id.as_deref() == Some(bookmark.id.as_str())}
                drag={draggable.then(|| drag_handlers.clone())}
                on_toggle_select={on_toggle_select.clone()}
                on_edit={on_edit_bookmark.clone()}
                on_delete={on_delete_bookmark.clone()}
            />
        }
    };

    let tiles = if query.trim().is_empty() {
        library
            .display_items()
            .iter()
            .map(|item| match item {
                DisplayItem::Group(group) => {
                    let members = library.group_members(&group.id);
                    let member_hover = members
                        .iter()
                        .find_map(|member| drag.zone_for(&member.id).map(|zone| (member.id.clone(), zone)));
                    html! {
                        <GroupTile
                            key={group.id.clone()}
                            group={group.clone()}
                            members={members}
                            mode={mode}
                            zone={drag.zone_for(&group.id)}
                            dragging={dragged_id.as_deref() == Some(group.id.as_str())}
                            drag={drag_handlers.clone()}
                            member_hover={member_hover}
                            dragged_id={dragged_id.clone()}
                            rename_on_mount={fresh_group.as_deref() == Some(group.id.as_str())}
                            selected={selected.clone()}
                            on_toggle_select={on_toggle_select.clone()}
                            on_rename={on_rename_group.clone()}
                            on_ungroup={on_ungroup.clone()}
                            on_delete={on_delete_group.clone()}
                            on_edit_bookmark={on_edit_bookmark.clone()}
                            on_delete_bookmark={on_delete_bookmark.clone()}
                            on_remove_member={on_remove_member.clone()}
                        />
                    }
                }
                DisplayItem::Bookmark(bookmark) => bookmark_tile(bookmark, true),
            })
            .collect::<Html>()
    } else {
        library
            .search(&query)
            .iter()
            .map(|bookmark| bookmark_tile(bookmark, false))
            .collect::<Html>()
    };

    let dragging_group = drag.dragged().is_some_and(|item| item.kind == ItemKind::Group);

    html! {
        <ContextProvider<Favicons> context={(*favicons).clone()}>
            <div class={classes!("newtab", dragging_group.then_some("dragging-group"))}>
                <header class="toolbar">
                    <input
                        type="text"
                        class="search-input"
                        placeholder="Search bookmarks..."
                        value={(*query).clone()}
                        oninput={on_search_input}
                    />
                    <Button onclick={on_add_bookmark} variant={ButtonVariant::Secondary}>
                        {"➕ Add"}
                    </Button>
                    <Button onclick={on_toggle_edit} variant={ButtonVariant::Secondary}>
                        {if mode == Mode::Edit { "✔️ Done" } else { "✏️ Edit" }}
                    </Button>
                    <Button onclick={on_toggle_select_mode} variant={ButtonVariant::Secondary}>
                        {if mode == Mode::Select { "Cancel" } else { "☑️ Select" }}
                    </Button>
                    if mode == Mode::Select {
                        <Button
                            onclick={on_delete_selected}
                            variant={ButtonVariant::Danger}
                            disabled={selected.is_empty()}
                        >
                            {format!("🗑️ Delete ({})", selected.len())}
                        </Button>
                    }
                    <label class="import-label">
                        {"📥 Import"}
                        <input type="file" accept=".html,.htm" class="import-input" onchange={on_import} />
                    </label>
                    <Button onclick={on_toggle_theme} variant={ButtonVariant::Plain}>
                        {if theme.is_dark() { "☀️" } else { "🌙" }}
                    </Button>
                </header>

                // Status display
                {match &*state {
                    PageState::Loading => html! {
                        <div class="loading-text-center">
                            <Spinner />
                            <p class="loading-text">{"Loading bookmarks..."}</p>
                        </div>
                    },
                    PageState::Notice(message) => html! {
                        <Alert r#type={AlertType::Info} title={message.clone()} inline={true}>
                        </Alert>
                    },
                    PageState::Error(err) => html! {
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    },
                    PageState::Idle => html! {}
                }}

                if !most_visited.is_empty() && query.trim().is_empty() {
                    <section class="most-visited">
                        <h2 class="section-title">{"Most visited"}</h2>
                        <div class="tile-grid">
                            {for most_visited.iter().map(|site| html! {
                                <MostVisitedTile
                                    key={site.url.clone()}
                                    site={site.clone()}
                                    on_rename={on_rename_site.clone()}
                                    on_remove={on_remove_site.clone()}
                                />
                            })}
                        </div>
                    </section>
                }

                <section class="bookmarks">
                    <h2 class="section-title">{"Bookmarks"}</h2>
                    if library.bookmarks().is_empty() && !matches!(*state, PageState::Loading) {
                        <div class="empty-state">
                            <p>{"No bookmarks yet."}</p>
                        </div>
                    } else {
                        <div class={classes!("tile-grid", (mode == Mode::Edit).then_some("editing"))}>
                            {tiles}
                        </div>
                    }
                </section>

                if let Some(current) = (*form).clone() {
                    <div class="modal-backdrop">
                        <div class="modal">
                            <h2>{if current.id.is_some() { "Edit bookmark" } else { "Add bookmark" }}</h2>
                            <input
                                type="text"
                                class="form-input"
                                placeholder="Title"
                                value={current.title.clone()}
                                oninput={on_form_title}
                            />
                            <input
                                type="url"
                                class="form-input"
                                placeholder="https://"
                                value={current.url.clone()}
                                oninput={on_form_url}
                            />
                            <div class="modal-actions">
                                <Button onclick={on_cancel_form} variant={ButtonVariant::Secondary}>
                                    {"Cancel"}
                                </Button>
                                <Button onclick={on_save_form} variant={ButtonVariant::Primary}>
                                    {"Save"}
                                </Button>
                            </div>
                        </div>
                    </div>
                }
            </div>
        </ContextProvider<Favicons>>
    }
}
