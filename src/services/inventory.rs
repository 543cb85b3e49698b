use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{file, inventory_item},
    errors::{DatastoreError, ServiceError, ValidationError},
    events::{Event, EventSender},
    spreadsheet::RowRecord,
};

/// Incoming inventory fields, before coercion and defaulting. Dates arrive
/// as raw strings so that an empty string can be normalized to absent at
/// this boundary rather than stored verbatim.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct InventoryItemInput {
    pub name: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<i32>,
    pub installation_date: Option<String>,
    pub last_maintenance: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub condition: Option<String>,
}

const DEFAULT_QUANTITY: i32 = 1;
const DEFAULT_STATUS: &str = "disponible";

/// Reconciliation service: CRUD on inventory records scoped to a parent
/// file, plus the bulk write path used by the import pipeline.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Items for one file, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_file(
        &self,
        file_id: Uuid,
    ) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let items = inventory_item::Entity::find()
            .filter(inventory_item::Column::FileId.eq(file_id))
            .order_by_desc(inventory_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(%file_id, error = %e, "failed to list inventory for file");
                DatastoreError::QueryFailed(e)
            })?;
        Ok(items)
    }

    /// Creates one item. Requires `name`, `item_name` and
    /// `installation_date`; `quantity` defaults to 1 and an empty-string
    /// maintenance date is stored as absent.
    #[instrument(skip(self, input), fields(%file_id, %actor_id))]
    pub async fn create(
        &self,
        file_id: Uuid,
        input: InventoryItemInput,
        actor_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        let model = build_item(file_id, &input)?;
        let id = model.id;

        let created = active_from(model)
            .insert(&*self.db)
            .await
            .map_err(|e| {
                error!(%file_id, error = %e, "failed to insert inventory item");
                DatastoreError::InsertFailed(e)
            })?;

        self.event_sender
            .send(Event::InventoryItemCreated(id))
            .await;
        info!(item_id = %id, "inventory item created");
        Ok(created)
    }

    /// Applies a partial update. Required fields are re-checked against the
    /// merged record, so a patch can never blank out a mandatory value.
    #[instrument(skip(self, patch), fields(%item_id, %actor_id))]
    pub async fn update(
        &self,
        item_id: Uuid,
        patch: InventoryItemInput,
        actor_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        let existing = self.find_existing(item_id).await?;

        let merged = InventoryItemInput {
            name: patch.name.or(Some(existing.name.clone())),
            item_name: patch.item_name.or(Some(existing.item_name.clone())),
            quantity: patch.quantity.or(Some(existing.quantity)),
            installation_date: patch
                .installation_date
                .or(Some(existing.installation_date.to_string())),
            last_maintenance: patch
                .last_maintenance
                .or(existing.last_maintenance.map(|d| d.to_string())),
            description: patch.description.or(existing.description.clone()),
            notes: patch.notes.or(existing.notes.clone()),
            status: patch.status.or(Some(existing.status.clone())),
            condition: patch.condition.or(existing.condition.clone()),
        };
        let validated = build_item(existing.file_id, &merged)?;

        let mut active: inventory_item::ActiveModel = existing.into();
        active.name = Set(validated.name);
        active.item_name = Set(validated.item_name);
        active.quantity = Set(validated.quantity);
        active.installation_date = Set(validated.installation_date);
        active.last_maintenance = Set(validated.last_maintenance);
        active.description = Set(validated.description);
        active.notes = Set(validated.notes);
        active.status = Set(validated.status);
        active.condition = Set(validated.condition);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(%item_id, error = %e, "failed to update inventory item");
            DatastoreError::UpdateFailed(e)
        })?;

        self.event_sender
            .send(Event::InventoryItemUpdated(item_id))
            .await;
        info!(%item_id, "inventory item updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(%item_id, %actor_id))]
    pub async fn delete(&self, item_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_existing(item_id).await?;

        inventory_item::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(%item_id, error = %e, "failed to delete inventory item");
                DatastoreError::DeleteFailed(e)
            })?;

        self.event_sender
            .send(Event::InventoryItemDeleted(item_id))
            .await;
        info!(%item_id, "inventory item deleted");
        Ok(())
    }

    /// Bulk write path for the import pipeline: coerces each record bag into
    /// a typed item with the same defaults and required-field rules as
    /// `create`, then inserts all rows in one statement. Any bad record
    /// aborts the whole batch before touching the database.
    #[instrument(skip(self, records), fields(%file_id, %actor_id, records = records.len()))]
    pub async fn create_from_records(
        &self,
        file_id: Uuid,
        records: &[RowRecord],
        actor_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let mut models = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let input = record_to_input(record);
            let model = build_item(file_id, &input).map_err(|e| {
                error!(%file_id, row = index + 2, error = %e, "spreadsheet row rejected");
                e
            })?;
            models.push(active_from(model));
        }

        if models.is_empty() {
            return Ok(0);
        }
        let count = models.len() as u64;

        inventory_item::Entity::insert_many(models)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(%file_id, error = %e, "bulk inventory insert failed");
                DatastoreError::InsertFailed(e)
            })?;

        info!(%file_id, count, "inventory rows created from import");
        Ok(count)
    }

    /// Optional maintenance operation: removes items whose parent file row
    /// no longer exists. Never called automatically; deleting a file leaves
    /// its items in place by design.
    #[instrument(skip(self))]
    pub async fn purge_orphaned_items(&self) -> Result<u64, ServiceError> {
        let parent_ids = SeaQuery::select()
            .column(file::Column::Id)
            .from(file::Entity)
            .to_owned();

        let result = inventory_item::Entity::delete_many()
            .filter(inventory_item::Column::FileId.not_in_subquery(parent_ids))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to purge orphaned inventory");
                DatastoreError::DeleteFailed(e)
            })?;

        info!(purged = result.rows_affected, "orphaned inventory purged");
        Ok(result.rows_affected)
    }

    async fn find_existing(&self, item_id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        inventory_item::Entity::find_by_id(item_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(%item_id, error = %e, "failed to load inventory item");
                ServiceError::from(DatastoreError::QueryFailed(e))
            })?
            .ok_or_else(|| {
                DatastoreError::NotFound(format!("inventory item {}", item_id)).into()
            })
    }
}

fn active_from(model: inventory_item::Model) -> inventory_item::ActiveModel {
    inventory_item::ActiveModel {
        id: Set(model.id),
        file_id: Set(model.file_id),
        name: Set(model.name),
        item_name: Set(model.item_name),
        quantity: Set(model.quantity),
        installation_date: Set(model.installation_date),
        last_maintenance: Set(model.last_maintenance),
        description: Set(model.description),
        notes: Set(model.notes),
        status: Set(model.status),
        condition: Set(model.condition),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

/// Coerces raw input into a persisted-shape model, applying defaults and
/// required-field checks. Checked in declaration order so the first missing
/// field is the one named in the error.
fn build_item(
    file_id: Uuid,
    input: &InventoryItemInput,
) -> Result<inventory_item::Model, ValidationError> {
    let name = required_text(&input.name, "name")?;
    let item_name = required_text(&input.item_name, "item_name")?;
    let installation_date = parse_date("installation_date", &input.installation_date)?
        .ok_or(ValidationError::MissingRequiredField("installation_date"))?;
    let last_maintenance = parse_date("last_maintenance", &input.last_maintenance)?;

    let quantity = input.quantity.unwrap_or(DEFAULT_QUANTITY);
    if quantity < 0 {
        return Err(ValidationError::InvalidField {
            field: "quantity",
            value: quantity.to_string(),
        });
    }

    Ok(inventory_item::Model {
        id: Uuid::new_v4(),
        file_id,
        name,
        item_name,
        quantity,
        installation_date,
        last_maintenance,
        description: trimmed(&input.description),
        notes: trimmed(&input.notes),
        status: trimmed(&input.status).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        condition: trimmed(&input.condition),
        created_at: Utc::now(),
        updated_at: None,
    })
}

fn required_text(
    value: &Option<String>,
    field: &'static str,
) -> Result<String, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingRequiredField(field)),
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Empty or missing dates are absent, never an empty string. Accepts ISO
/// dates and the `dd/mm/yyyy` form common in the source spreadsheets.
fn parse_date(
    field: &'static str,
    raw: &Option<String>,
) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(value) = raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidField {
            field,
            value: value.to_string(),
        })
}

/// Maps a record bag onto typed input using the normalized header keys the
/// source templates use, English or Spanish. Unknown keys are ignored.
fn record_to_input(record: &RowRecord) -> InventoryItemInput {
    const KNOWN: &[&str] = &[
        "name",
        "nombre",
        "item_name",
        "equipo",
        "quantity",
        "cantidad",
        "installation_date",
        "fecha_de_instalación",
        "fecha_de_instalacion",
        "last_maintenance",
        "último_mantenimiento",
        "ultimo_mantenimiento",
        "description",
        "descripción",
        "descripcion",
        "notes",
        "notas",
        "observaciones",
        "status",
        "estado",
        "condition",
        "condición",
        "condicion",
    ];
    for key in record.keys() {
        if !KNOWN.contains(&key) {
            debug!(key, "ignoring unmapped spreadsheet column");
        }
    }

    InventoryItemInput {
        name: record.text(&["name", "nombre"]),
        item_name: record.text(&["item_name", "equipo"]),
        quantity: None,
        installation_date: record.text(&[
            "installation_date",
            "fecha_de_instalación",
            "fecha_de_instalacion",
        ]),
        last_maintenance: record.text(&[
            "last_maintenance",
            "último_mantenimiento",
            "ultimo_mantenimiento",
        ]),
        description: record.text(&["description", "descripción", "descripcion"]),
        notes: record.text(&["notes", "notas", "observaciones"]),
        status: record.text(&["status", "estado"]),
        condition: record.text(&["condition", "condición", "condicion"]),
    }
    .with_quantity(record.text(&["quantity", "cantidad"]))
}

impl InventoryItemInput {
    fn with_quantity(mut self, raw: Option<String>) -> Self {
        // Blank quantities fall through to the default of 1; a non-numeric
        // value is kept out rather than failing the whole row.
        self.quantity = raw.and_then(|v| v.parse::<i32>().ok());
        self
    }
}
