//! Admin panel: product table and product create/edit/delete.
//!
//! Every handler takes [`RequireAdmin`], so nothing here renders before the
//! session is resolved. Reads go straight to Supabase rather than through
//! the catalog view so the panel always shows the latest rows; after each
//! successful write the catalog view is told to refetch products.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::{instrument, warn};

use panaderia_core::form::validate_image_type;
use panaderia_core::{
    Category, CategoryGroup, Product, ProductForm, ProductId, ValidationError, resolve,
};

use crate::catalog::Sources;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::{CurrentAdmin, Flash, FlashKind};
use crate::state::AppState;
use crate::supabase::{SupabaseError, object_name};

// =============================================================================
// Templates
// =============================================================================

/// Product table grouped by category.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub page: PageContext,
    pub groups: Vec<CategoryGroup>,
    pub total: usize,
    pub error: Option<String>,
}

/// Create and edit form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub categories: Vec<Category>,
    pub form: ProductForm,
}

/// Delete confirmation.
#[derive(Template, WebTemplate)]
#[template(path = "admin/delete.html")]
pub struct DeleteTemplate {
    pub page: PageContext,
    pub product: Product,
}

// =============================================================================
// Form plumbing
// =============================================================================

/// Which write a submitted form performs.
#[derive(Debug, Clone)]
enum Target {
    Create,
    Update(ProductId),
}

impl Target {
    const fn heading(&self) -> &'static str {
        match self {
            Self::Create => "Agregar Producto",
            Self::Update(_) => "Editar Producto",
        }
    }

    const fn submit_label(&self) -> &'static str {
        match self {
            Self::Create => "Agregar",
            Self::Update(_) => "Guardar Cambios",
        }
    }

    fn action(&self) -> String {
        match self {
            Self::Create => "/admin/productos".to_string(),
            Self::Update(id) => format!("/admin/productos/{id}"),
        }
    }

    const fn success_title(&self) -> &'static str {
        match self {
            Self::Create => "Producto agregado",
            Self::Update(_) => "Producto editado",
        }
    }
}

/// An image file attached to the form.
struct Upload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// The multipart body of the product form.
struct Submission {
    form: ProductForm,
    image: Option<Upload>,
}

/// Read the product form fields and the optional `image` file.
///
/// An empty file input (no name or no bytes) counts as no upload.
async fn read_submission(multipart: &mut Multipart) -> Result<Submission, MultipartError> {
    let mut form = ProductForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    image = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "name" => form.name = field.text().await?,
            "description" => form.description = field.text().await?,
            "price" => form.price = field.text().await?,
            "category_id" => form.category_id = field.text().await?,
            "image_url" => form.image_url = field.text().await?,
            _ => {}
        }
    }

    Ok(Submission { form, image })
}

/// Render the form, loading the category options.
///
/// A failed category fetch still renders the form, with an empty select.
async fn render_form(
    state: &AppState,
    page: PageContext,
    target: &Target,
    form: ProductForm,
    status: StatusCode,
) -> Response {
    let categories = state
        .supabase()
        .list_categories()
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Could not load categories for the product form");
            Vec::new()
        });

    let template = ProductFormTemplate {
        page,
        heading: target.heading(),
        action: target.action(),
        submit_label: target.submit_label(),
        categories,
        form,
    };
    (status, template).into_response()
}

fn validation_flash(err: &ValidationError) -> Flash {
    Flash::error(err.title(), err.description())
}

/// Validate, upload the image if any, then insert or update.
///
/// Validation failures re-render with 422 and make no remote call. Upload
/// and write failures re-render with 502; a new image that was uploaded
/// before a failed write is left in the bucket.
async fn save(
    state: &AppState,
    admin: &CurrentAdmin,
    session: &Session,
    target: Target,
    mut multipart: Multipart,
) -> Response {
    let Submission { form, image } = match read_submission(&mut multipart).await {
        Ok(submission) => submission,
        Err(e) => return AppError::BadRequest(e.body_text()).into_response(),
    };
    let page = PageContext::for_admin(admin, session).await;

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(e) => {
            let page = page.with_flash(validation_flash(&e));
            return render_form(state, page, &target, form, StatusCode::UNPROCESSABLE_ENTITY)
                .await;
        }
    };

    let token = admin.access_token();
    let draft = match image {
        None => draft,
        Some(upload) => {
            if let Err(e) = validate_image_type(&upload.content_type) {
                let page = page.with_flash(validation_flash(&e));
                return render_form(state, page, &target, form, StatusCode::UNPROCESSABLE_ENTITY)
                    .await;
            }

            let object = object_name(&upload.file_name, &admin.user_id, Utc::now());
            match state
                .supabase()
                .upload_image(&object, &upload.content_type, upload.bytes, &token)
                .await
            {
                Ok(url) => draft.with_image(url),
                Err(e) => return write_failed(state, page, &target, form, &e).await,
            }
        }
    };

    let record = draft.into_record(admin.user_id.clone());
    let written = match &target {
        Target::Create => state.supabase().insert_product(&record, &token).await,
        Target::Update(id) => state.supabase().update_product(id, &record, &token).await,
    };
    if let Err(e) = written {
        return write_failed(state, page, &target, form, &e).await;
    }

    Flash::titled(FlashKind::Success, target.success_title())
        .push(session)
        .await;
    add_breadcrumb("admin", target.success_title(), Some(&[("name", record.name.as_str())]));
    state.catalog().refresh(Sources::PRODUCTS);

    Redirect::to("/admin").into_response()
}

async fn write_failed(
    state: &AppState,
    page: PageContext,
    target: &Target,
    form: ProductForm,
    err: &SupabaseError,
) -> Response {
    warn!(error = %err, "Product write failed");
    let page = page.with_flash(Flash::error("Error", err.user_message()));
    render_form(state, page, target, form, StatusCode::BAD_GATEWAY).await
}

/// Flash "Error interno" and send the admin back to the table.
async fn missing_product(session: &Session) -> Response {
    Flash::error("Error interno", "No se encontró el producto a editar.")
        .push(session)
        .await;
    Redirect::to("/admin").into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product table.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> Response {
    let page = PageContext::for_admin(&admin, &session).await;
    let supabase = state.supabase();
    let (categories, products) = tokio::join!(supabase.list_categories(), supabase.list_products());

    let (groups, error) = match (categories, products) {
        (Ok(categories), Ok(products)) => (resolve(&categories, &products), None),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Admin panel fetch failed");
            (Vec::new(), Some(e.user_message()))
        }
    };
    let total = groups.iter().map(|g| g.products.len()).sum();

    AdminIndexTemplate {
        page,
        groups,
        total,
        error,
    }
    .into_response()
}

/// Display the create form.
#[instrument(skip_all)]
pub async fn new_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> Response {
    let page = PageContext::for_admin(&admin, &session).await;
    render_form(
        &state,
        page,
        &Target::Create,
        ProductForm::default(),
        StatusCode::OK,
    )
    .await
}

/// Handle the create form.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    multipart: Multipart,
) -> Response {
    save(&state, &admin, &session, Target::Create, multipart).await
}

/// Display the edit form pre-filled from the stored product.
#[instrument(skip(state, admin, session))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let id = ProductId::new(id);
    let product = match state.supabase().get_product(&id).await {
        Ok(product) => product,
        Err(SupabaseError::NotFound(_)) => return missing_product(&session).await,
        Err(e) => return AppError::from(e).into_response(),
    };

    let page = PageContext::for_admin(&admin, &session).await;
    render_form(
        &state,
        page,
        &Target::Update(id),
        ProductForm::from_product(&product),
        StatusCode::OK,
    )
    .await
}

/// Handle the edit form.
#[instrument(skip(state, admin, session, multipart))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let target = Target::Update(ProductId::new(id));
    save(&state, &admin, &session, target, multipart).await
}

/// Display the delete confirmation.
#[instrument(skip(state, admin, session))]
pub async fn confirm_delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let product = match state.supabase().get_product(&ProductId::new(id)).await {
        Ok(product) => product,
        Err(SupabaseError::NotFound(_)) => return missing_product(&session).await,
        Err(e) => return AppError::from(e).into_response(),
    };

    let page = PageContext::for_admin(&admin, &session).await;
    DeleteTemplate { page, product }.into_response()
}

/// Hard-delete a product.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Redirect {
    let id = ProductId::new(id);
    match state
        .supabase()
        .delete_product(&id, &admin.access_token())
        .await
    {
        Ok(()) => {
            Flash::titled(FlashKind::Success, "Producto eliminado")
                .push(&session)
                .await;
            add_breadcrumb("admin", "Product deleted", Some(&[("product_id", id.as_str())]));
            state.catalog().refresh(Sources::PRODUCTS);
        }
        Err(e) => {
            warn!(error = %e, product_id = %id, "Product delete failed");
            Flash::error("Error", e.user_message()).push(&session).await;
        }
    }
    Redirect::to("/admin")
}
