/// Reusable tiles for the new tab page

use std::rc::Rc;

use log::debug;
use patternfly_yew::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

use crate::bookmark_data::{Bookmark, Group, MostVisitedSite};
use crate::chrome::ChromeHost;
use crate::config::{DEFAULT_ICON, FaviconConfig};
use crate::drag::{HoverZone, ItemRef, Rect};
use crate::favicon::FaviconResolver;
use crate::session::Mode;
use crate::storage::{favicon_key, load_json};

pub type Resolver = FaviconResolver<ChromeHost, ChromeHost>;

/// Page-wide favicon resolver, shared through a context
#[derive(Clone)]
pub struct Favicons(pub Rc<Resolver>);

impl Favicons {
    pub fn new(config: FaviconConfig) -> Self {
        let host = ChromeHost::new();
        let resolver = FaviconResolver::new(host, host, config).with_internal_base(host.favicon_base());
        Favicons(Rc::new(resolver))
    }
}

impl PartialEq for Favicons {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Properties, PartialEq)]
pub struct FaviconImgProps {
    pub url: String,
    /// Bookmarks may have an icon cached by the background warmer
    #[prop_or_default]
    pub bookmark_id: Option<String>,
}

#[function_component(FaviconImg)]
pub fn favicon_img(props: &FaviconImgProps) -> Html {
    let favicons = use_context::<Favicons>();
    let src = use_state(|| {
        favicons
            .as_ref()
            .and_then(|f| f.0.cached(&props.url))
            .unwrap_or_else(|| DEFAULT_ICON.to_string())
    });

    {
        let src = src.clone();
        use_effect_with((props.url.clone(), props.bookmark_id.clone()), move |(url, bookmark_id)| {
            let url = url.clone();
            let bookmark_id = bookmark_id.clone();
            spawn_local(async move {
                if let Some(id) = bookmark_id {
                    match load_json::<String, _>(&ChromeHost, &favicon_key(&id)).await {
                        Ok(Some(data_url)) => {
                            src.set(data_url);
                            return;
                        }
                        Ok(None) => {}
                        Err(e) => debug!("No cached favicon for {}: {}", id, e),
                    }
                }
                if let Some(favicons) = favicons {
                    src.set(favicons.0.resolve(&url).await);
                }
            });
            || ()
        });
    }

    html! {
        <img class="favicon" src={(*src).clone()} alt="" loading="lazy" />
    }
}

/// Drag callbacks shared by every draggable tile
#[derive(Clone, PartialEq)]
pub struct DragHandlers {
    pub on_start: Callback<ItemRef>,
    pub on_over: Callback<(ItemRef, Rect, f64, f64)>,
    pub on_leave: Callback<String>,
    pub on_drop: Callback<String>,
    pub on_end: Callback<()>,
}

struct TileDrag {
    start: Callback<DragEvent>,
    over: Callback<DragEvent>,
    leave: Callback<DragEvent>,
    drop: Callback<DragEvent>,
    end: Callback<DragEvent>,
}

fn tile_rect(e: &DragEvent) -> Option<Rect> {
    let element = e.current_target()?.dyn_into::<web_sys::Element>().ok()?;
    let r = element.get_bounding_client_rect();
    Some(Rect::new(r.left(), r.top(), r.width(), r.height()))
}

impl DragHandlers {
    fn bind(&self, item: ItemRef) -> TileDrag {
        let start = {
            let on_start = self.on_start.clone();
            let item = item.clone();
            Callback::from(move |e: DragEvent| {
                // Group members sit inside a draggable group tile
                e.stop_propagation();
                // Firefox will not start a drag without data
                if let Some(transfer) = e.data_transfer() {
                    if let Err(e) = transfer.set_data("text/plain", &item.id) {
                        debug!("Could not set drag data for {}: {:?}", item.id, e);
                    }
                }
                on_start.emit(item.clone());
            })
        };
        let over = {
            let on_over = self.on_over.clone();
            let item = item.clone();
            Callback::from(move |e: DragEvent| {
                e.prevent_default();
                e.stop_propagation();
                if let Some(rect) = tile_rect(&e) {
                    on_over.emit((item.clone(), rect, e.client_x() as f64, e.client_y() as f64));
                }
            })
        };
        let leave = {
            let on_leave = self.on_leave.clone();
            let id = item.id.clone();
            Callback::from(move |e: DragEvent| {
                e.stop_propagation();
                on_leave.emit(id.clone());
            })
        };
        let drop = {
            let on_drop = self.on_drop.clone();
            let id = item.id.clone();
            Callback::from(move |e: DragEvent| {
                e.prevent_default();
                e.stop_propagation();
                on_drop.emit(id.clone());
            })
        };
        let end = {
            let on_end = self.on_end.clone();
            Callback::from(move |e: DragEvent| {
                e.stop_propagation();
                on_end.emit(());
            })
        };
        TileDrag {
            start,
            over,
            leave,
            drop,
            end,
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct BookmarkTileProps {
    pub bookmark: Bookmark,
    pub mode: Mode,
    #[prop_or_default]
    pub selected: bool,
    #[prop_or_default]
    pub zone: Option<HoverZone>,
    #[prop_or_default]
    pub dragging: bool,
    /// Search results are not draggable
    #[prop_or_default]
    pub drag: Option<DragHandlers>,
    pub on_toggle_select: Callback<String>,
    pub on_edit: Callback<Bookmark>,
    pub on_delete: Callback<String>,
    #[prop_or_default]
    pub on_ungroup: Option<Callback<String>>,
}

#[function_component(BookmarkTile)]
pub fn bookmark_tile(props: &BookmarkTileProps) -> Html {
    let bookmark = &props.bookmark;
    let class = classes!(
        "tile",
        "bookmark-tile",
        props.selected.then_some("selected"),
        props.dragging.then_some("dragging"),
        props.zone.map(|zone| zone.css_class()),
    );
    let body = html! {
        <>
            <FaviconImg url={bookmark.url.clone()} bookmark_id={Some(bookmark.id.clone())} />
            <span class="tile-title">{&bookmark.title}</span>
        </>
    };

    match props.mode {
        Mode::Browse => html! {
            <a class={class} href={bookmark.url.clone()} title={bookmark.url.clone()}>
                {body}
            </a>
        },
        Mode::Select => {
            let on_toggle = {
                let on_toggle_select = props.on_toggle_select.clone();
                let id = bookmark.id.clone();
                Callback::from(move |_: MouseEvent| on_toggle_select.emit(id.clone()))
            };
            html! {
                <div class={class} onclick={on_toggle}>
                    <input type="checkbox" class="tile-check" checked={props.selected} />
                    {body}
                </div>
            }
        }
        Mode::Edit => {
            let on_edit = {
                let on_edit = props.on_edit.clone();
                let bookmark = bookmark.clone();
                Callback::from(move |_: MouseEvent| on_edit.emit(bookmark.clone()))
            };
            let on_delete = {
                let on_delete = props.on_delete.clone();
                let id = bookmark.id.clone();
                Callback::from(move |_: MouseEvent| on_delete.emit(id.clone()))
            };
            let on_ungroup = props.on_ungroup.clone().map(|on_ungroup| {
                let id = bookmark.id.clone();
                Callback::from(move |_: MouseEvent| on_ungroup.emit(id.clone()))
            });
            let actions = html! {
                <div class="tile-actions">
                    <Button variant={ButtonVariant::Plain} onclick={on_edit}>{"✏️"}</Button>
                    if let Some(on_ungroup) = on_ungroup {
                        <Button variant={ButtonVariant::Plain} onclick={on_ungroup}>{"↩️"}</Button>
                    }
                    <Button variant={ButtonVariant::Plain} onclick={on_delete}>{"🗑️"}</Button>
                </div>
            };

            match &props.drag {
                Some(handlers) => {
                    let drag = handlers.bind(ItemRef::bookmark(&bookmark.id));
                    html! {
                        <div
                            class={class}
                            draggable="true"
                            ondragstart={drag.start}
                            ondragover={drag.over}
                            ondragleave={drag.leave}
                            ondrop={drag.drop}
                            ondragend={drag.end}
                        >
                            {body}
                            {actions}
                        </div>
                    }
                }
                None => html! {
                    <div class={class}>
                        {body}
                        {actions}
                    </div>
                },
            }
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct GroupTileProps {
    pub group: Group,
    pub members: Vec<Bookmark>,
    pub mode: Mode,
    #[prop_or_default]
    pub zone: Option<HoverZone>,
    #[prop_or_default]
    pub dragging: bool,
    pub drag: DragHandlers,
    /// Hover zone over one of the expanded members
    #[prop_or_default]
    pub member_hover: Option<(String, HoverZone)>,
    #[prop_or_default]
    pub dragged_id: Option<String>,
    /// Open the name editor straight away, for a group just created by a drop
    #[prop_or_default]
    pub rename_on_mount: bool,
    pub selected: Vec<String>,
    pub on_toggle_select: Callback<String>,
    pub on_rename: Callback<(String, String)>,
    pub on_ungroup: Callback<String>,
    pub on_delete: Callback<String>,
    pub on_edit_bookmark: Callback<Bookmark>,
    pub on_delete_bookmark: Callback<String>,
    pub on_remove_member: Callback<String>,
}

#[function_component(GroupTile)]
pub fn group_tile(props: &GroupTileProps) -> Html {
    let expanded = use_state(|| false);
    let renaming = use_state(|| props.rename_on_mount);
    let name_value = use_state(|| props.group.name.clone());
    let group = &props.group;

    let toggle_expanded = {
        let expanded = expanded.clone();
        Callback::from(move |_: MouseEvent| expanded.set(!*expanded))
    };

    let on_start_rename = {
        let renaming = renaming.clone();
        let name_value = name_value.clone();
        let name = group.name.clone();
        Callback::from(move |_: MouseEvent| {
            name_value.set(name.clone());
            renaming.set(true);
        })
    };

    let on_name_input = {
        let name_value = name_value.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                name_value.set(input.value());
            }
        })
    };

    let on_save_rename = {
        let renaming = renaming.clone();
        let name_value = name_value.clone();
        let on_rename = props.on_rename.clone();
        let id = group.id.clone();
        move || {
            on_rename.emit((id.clone(), (*name_value).clone()));
            renaming.set(false);
        }
    };

    let on_name_key = {
        let renaming = renaming.clone();
        let save = on_save_rename.clone();
        Callback::from(move |e: KeyboardEvent| match e.key().as_str() {
            "Enter" => save(),
            "Escape" => renaming.set(false),
            _ => {}
        })
    };

    let on_save_click = Callback::from(move |_: MouseEvent| on_save_rename());

    let on_ungroup = {
        let on_ungroup = props.on_ungroup.clone();
        let id = group.id.clone();
        Callback::from(move |_: MouseEvent| on_ungroup.emit(id.clone()))
    };

    let on_delete = {
        let on_delete = props.on_delete.clone();
        let id = group.id.clone();
        Callback::from(move |_: MouseEvent| on_delete.emit(id.clone()))
    };

    let drag = props.drag.bind(ItemRef::group(&group.id));
    let editing = props.mode == Mode::Edit;
    let class = classes!(
        "tile",
        "group-tile",
        (*expanded).then_some("expanded"),
        props.dragging.then_some("dragging"),
        props.zone.map(|zone| zone.css_class()),
    );

    html! {
        <div
            class={class}
            draggable={if editing { "true" } else { "false" }}
            ondragstart={editing.then_some(drag.start)}
            ondragover={editing.then_some(drag.over)}
            ondragleave={editing.then_some(drag.leave)}
            ondrop={editing.then_some(drag.drop)}
            ondragend={editing.then_some(drag.end)}
        >
            <div class="group-header">
                <div class="group-icons" onclick={toggle_expanded}>
                    {for props.members.iter().take(4).map(|member| html! {
                        <FaviconImg url={member.url.clone()} bookmark_id={Some(member.id.clone())} />
                    })}
                </div>
                if *renaming {
                    <input
                        type="text"
                        class="group-name-input"
                        value={(*name_value).clone()}
                        oninput={on_name_input}
                        onkeydown={on_name_key}
                    />
                    <Button variant={ButtonVariant::Plain} onclick={on_save_click}>{"✓"}</Button>
                } else {
                    <span class="tile-title group-name">
                        {format!("{} ({})", group.name, props.members.len())}
                    </span>
                }
                if editing && !*renaming {
                    <div class="tile-actions">
                        <Button variant={ButtonVariant::Plain} onclick={on_start_rename}>{"✏️"}</Button>
                        <Button variant={ButtonVariant::Plain} onclick={on_ungroup}>{"📤"}</Button>
                        <Button variant={ButtonVariant::Plain} onclick={on_delete}>{"🗑️"}</Button>
                    </div>
                }
            </div>
            if *expanded {
                <div class="group-members">
                    {for props.members.iter().map(|member| html! {
                        <BookmarkTile
                            key={member.id.clone()}
                            bookmark={member.clone()}
                            mode={props.mode}
                            selected={props.selected.contains(&member.id)}
                            zone={props
                                .member_hover
                                .as_ref()
                                .filter(|(id, _)| *id == member.id)
                                .map(|(_, zone)| *zone)}
                            dragging={props.dragged_id.as_deref() == Some(member.id.as_str())}
                            drag={editing.then(|| props.drag.clone())}
                            on_toggle_select={props.on_toggle_select.clone()}
                            on_edit={props.on_edit_bookmark.clone()}
                            on_delete={props.on_delete_bookmark.clone()}
                            on_ungroup={Some(props.on_remove_member.clone())}
                        />
                    })}
                </div>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct MostVisitedTileProps {
    pub site: MostVisitedSite,
    pub on_rename: Callback<MostVisitedSite>,
    pub on_remove: Callback<String>,
}

#[function_component(MostVisitedTile)]
pub fn most_visited_tile(props: &MostVisitedTileProps) -> Html {
    let site = &props.site;

    let on_rename = {
        let on_rename = props.on_rename.clone();
        let site = site.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_rename.emit(site.clone());
        })
    };

    let on_remove = {
        let on_remove = props.on_remove.clone();
        let url = site.url.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_remove.emit(url.clone());
        })
    };

    html! {
        <div class="tile most-visited-tile">
            <a href={site.url.clone()} title={site.original_title.clone()}>
                <FaviconImg url={site.url.clone()} />
                <span class="tile-title">{&site.title}</span>
            </a>
            <div class="tile-actions">
                <Button variant={ButtonVariant::Plain} onclick={on_rename}>{"✏️"}</Button>
                <Button variant={ButtonVariant::Plain} onclick={on_remove}>{"✕"}</Button>
            </div>
        </div>
    }
}
